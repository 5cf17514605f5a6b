pub mod color;
pub mod engine;
pub mod headless;
pub mod picking;
pub mod primitive;
pub mod structure;

pub use color::Color;
pub use engine::*;
pub use primitive::*;
pub use structure::*;
