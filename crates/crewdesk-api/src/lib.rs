pub mod chat;
pub mod error;
pub mod middleware;
pub mod resources;
pub mod state;
