// Library surface shared by the CLI and the integration tests.
pub mod app_dirs;
pub mod assets;
pub mod chat;
pub mod config;
pub mod error;
pub mod moderation;
pub mod notes;
pub mod permissions;
pub mod profile;
pub mod quiz;
pub mod runtime;

pub use error::{Error, Result};
