pub mod ecef;
pub mod geodesy;
pub mod local;
pub mod vec;
pub mod zoom;

pub use ecef::*;
pub use geodesy::*;
pub use local::*;
pub use vec::*;
pub use zoom::*;
