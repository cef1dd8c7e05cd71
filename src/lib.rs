//! Telescope - Pilot Intel Companion
//!
//! Streams pilot intel lookups into a severity-ordered store and keeps a
//! primary window and a frameless overlay window converged over a
//! publish/subscribe event channel.

pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod intel;
pub mod session;
pub mod settings;
pub mod store;
pub mod sync;
pub mod window;

pub use error::{Result, TelescopeError};
