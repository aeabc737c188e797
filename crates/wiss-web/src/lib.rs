pub mod config;
pub mod error;
mod render;
pub mod server;

pub use server::{create_router, AppState};
