pub mod image;
pub mod package;
pub mod tag;

pub use image::*;
pub use package::*;
pub use tag::*;
