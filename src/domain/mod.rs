pub mod lifecycle;
pub mod portfolio;
pub mod project;
pub mod user;

pub use portfolio::*;
pub use project::*;
pub use user::*;
