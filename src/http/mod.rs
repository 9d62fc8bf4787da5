pub mod app_error;
pub mod server;
pub mod state;
pub mod upload;
