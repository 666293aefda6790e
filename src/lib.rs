// Yatube - a small blogging service: posts, groups, comments and follows

pub mod app_state;
pub mod config;
pub mod entities;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod render;
pub mod routes;
pub mod services;
pub mod views;

// Storage, cache, media and viewer plumbing
pub mod infrastructure;

// Re-exports for convenience
pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::create_router;
