//! Typed expression tree.

pub mod builders;
pub mod column;
pub mod expr;
pub mod operators;
pub mod param;

pub use builders::*;
pub use column::*;
pub use expr::*;
pub use operators::*;
pub use param::Param;
