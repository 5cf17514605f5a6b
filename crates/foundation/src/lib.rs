pub mod math;

// Foundation crate: small, well-tested primitives only.
pub use math::{GeoPoint, Vec2, Vec3};
