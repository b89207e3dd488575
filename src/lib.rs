pub mod clock;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod layering;
pub mod lifecycle;
pub mod panel;
pub mod session;
pub mod web;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
