pub mod common;
pub mod issue;
pub mod project;

pub use common::*;
pub use issue::*;
pub use project::*;
