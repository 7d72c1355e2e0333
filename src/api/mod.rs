pub mod body_extractor;
pub mod handlers;
pub mod project_extractor;
pub mod routes;

pub use body_extractor::*;
pub use handlers::*;
pub use project_extractor::*;
pub use routes::*;
