//! Typed client for the platform controller's hooks API.
//!
//! The build engine talks to the controller twice per push: once to fetch the
//! app's configuration before the build, once to publish the release after
//! it. Both calls authenticate with the shared builder key and tolerate a
//! minor controller/client API version skew.

pub mod client;
pub mod error;
pub mod types;

pub use client::ControllerClient;
pub use error::{ControllerError, Result};
pub use types::{AppConfig, ProcessType};
