pub mod issue_filter;
pub mod sanitize;

pub use issue_filter::*;
pub use sanitize::*;
