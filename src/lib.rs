pub mod app;
pub mod auth;
pub mod capability;
pub mod cli;
pub mod config;
pub mod error;
pub mod navigation;
pub mod refresh;
pub mod resources;
pub mod session;
pub mod transport;
pub mod types;

pub use app::Console;
pub use error::{ClientError, ClientResult};
