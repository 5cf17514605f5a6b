pub mod expression;
pub mod render;
pub mod store;
pub mod style;

pub use expression::{Expr, display_string, eval_expr};
pub use render::build_primitives;
pub use store::LayerStore;
pub use style::{LayerDef, LayerKind};
