mod apkindex;
mod chainctl;
mod config;
mod mappings;
mod models;
mod packages;
mod probe;
mod registry;
mod resolver;
mod session;
mod tags;

use crate::apkindex::ApkIndexLoader;
use crate::chainctl::{CatalogClient, ChainctlClient};
use crate::config::Settings;
use crate::mappings::{AliasTable, GenericBaseSet};
use crate::models::SourceDistro;
use crate::packages::{BuiltinMappings, find_equivalent_apk_packages};
use crate::probe::CraneProber;
use crate::registry::OciCatalogClient;
use crate::resolver::Resolver;
use crate::session::SelectionSession;
use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "fairlead",
    version,
    about = "Maps Dockerfile base images and packages to curated minimal-image catalog equivalents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the catalog equivalent for a source image reference
    Find {
        /// Source image with optional tag (e.g. 'python', 'node:18-alpine')
        source_image: String,
        /// Catalog organization; omitted, the available ones are listed
        #[arg(long)]
        organization: Option<String>,
        /// Image variant: 'distroless', 'slim', or 'dev'
        #[arg(long)]
        variant: Option<String>,
    },
    /// Find the best matching catalog tag for an original tag
    Tag {
        /// Catalog image name (e.g. 'python', 'node', 'nginx')
        catalog_image: String,
        /// Original tag to match (e.g. '3.12', '18-alpine', 'latest')
        original_tag: String,
        /// Image variant: 'distroless', 'slim', or 'dev'
        #[arg(long, default_value = "distroless")]
        variant: String,
        /// Original source image name, for reporting
        #[arg(long)]
        original_image: Option<String>,
        /// Catalog organization
        #[arg(long)]
        organization: Option<String>,
    },
    /// Verify that a full image reference exists in the catalog registry
    Verify {
        /// Full image reference (e.g. 'cgr.dev/<org>/python:3.12')
        image_reference: String,
        /// Catalog organization
        #[arg(long)]
        organization: Option<String>,
    },
    /// Map apt/yum package names to their APK equivalents
    MapPackages {
        /// Source package names (e.g. 'libssl-dev' 'build-essential')
        #[arg(required = true)]
        packages: Vec<String>,
        /// Source distribution: 'apt', 'yum', 'dnf', or 'auto'
        #[arg(long, default_value = "auto")]
        distro: String,
    },
    /// Search the APK package index
    SearchPackages {
        /// Package name or search term
        query: String,
        /// Search provides entries instead of names: 'cmd' or 'so'
        #[arg(long)]
        provides: Option<String>,
        /// Architecture: 'x86_64' or 'aarch64'
        #[arg(long, default_value = "x86_64")]
        arch: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "fairlead=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Commands::Find {
            source_image,
            organization,
            variant,
        } => {
            let resolver = build_resolver(&settings);
            let resolution = resolver
                .find_equivalent_image(&source_image, organization.as_deref(), variant.as_deref())
                .await;
            print_json(&resolution)
        }
        Commands::Tag {
            catalog_image,
            original_tag,
            variant,
            original_image,
            organization,
        } => {
            let resolver = build_resolver(&settings);
            if let Err(resolution) = resolver
                .ensure_organization(&catalog_image, organization.as_deref())
                .await
            {
                return print_json(&*resolution);
            }
            let original_image = original_image.unwrap_or_else(|| catalog_image.clone());
            let result = resolver
                .lookup_tag(&catalog_image, &original_image, &original_tag, &variant)
                .await;
            print_json(&result)
        }
        Commands::Verify {
            image_reference,
            organization,
        } => {
            let resolver = build_resolver(&settings);
            if let Err(resolution) = resolver
                .ensure_organization(&image_reference, organization.as_deref())
                .await
            {
                return print_json(&*resolution);
            }
            let result = resolver.verify_tag(&image_reference).await;
            print_json(&result)
        }
        Commands::MapPackages { packages, distro } => {
            let distro: SourceDistro = distro.parse()?;
            let loader = ApkIndexLoader::new(&settings);
            let mappings = BuiltinMappings::builtin();
            let result =
                find_equivalent_apk_packages(&loader, &mappings, &packages, distro).await;
            print_json(&result)
        }
        Commands::SearchPackages {
            query,
            provides,
            arch,
            limit,
        } => {
            let loader = ApkIndexLoader::new(&settings);
            let result = search_packages(&loader, &query, provides.as_deref(), &arch, limit).await;
            print_json(&result)
        }
    }
}

/// Wire the resolver to the real collaborators: chainctl when available,
/// anonymous OCI access to the public registry otherwise.
fn build_resolver(settings: &Settings) -> Resolver {
    let catalog: Arc<dyn CatalogClient> = if ChainctlClient::is_available() {
        Arc::new(ChainctlClient::new(settings))
    } else {
        warn!("chainctl not found on PATH, using anonymous public registry access");
        Arc::new(OciCatalogClient::new())
    };

    Resolver::new(
        catalog,
        Arc::new(CraneProber::new(settings)),
        Arc::new(SelectionSession::new()),
        Arc::new(AliasTable::builtin()),
        Arc::new(GenericBaseSet::builtin()),
    )
}

async fn search_packages(
    loader: &ApkIndexLoader,
    query: &str,
    provides: Option<&str>,
    arch: &str,
    limit: usize,
) -> models::PackageSearchResult {
    let index = match loader.load(arch).await {
        Ok(index) => index,
        Err(e) => {
            return models::PackageSearchResult {
                query: query.to_string(),
                arch: arch.to_string(),
                packages: Vec::new(),
                total_count: 0,
                warning: Some(format!("Failed to load APK index: {e}")),
            };
        }
    };

    let found = match provides {
        Some(prefix) => index.search_provides(query, Some(prefix), limit),
        None => index.search(query, limit),
    };
    let packages: Vec<_> = found.into_iter().cloned().collect();

    info!("Found {} package(s) for '{}'", packages.len(), query);

    models::PackageSearchResult {
        query: query.to_string(),
        arch: arch.to_string(),
        total_count: packages.len(),
        packages,
        warning: None,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
