//! Night stocker web application: the Stocker and Tech screens, their
//! view-models, and the HTTP server around them.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
pub mod prompt;
pub mod screens;
pub mod tech;
pub mod view_model;
