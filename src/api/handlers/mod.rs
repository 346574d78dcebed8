pub mod admin;
pub mod auth;
pub mod portfolio;
pub mod projects;
pub mod root;
