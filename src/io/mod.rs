pub mod array;
pub mod image;
