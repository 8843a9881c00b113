//! Image-to-3D relay service.
//!
//! Accepts an image over HTTP, publishes it through a storage backend,
//! submits it to a 3D generation provider, and reports the provider's task
//! status in one canonical vocabulary, either by waiting for the result or
//! by handing back a task id for later status checks.

pub mod app;
pub mod config;
pub mod error;
pub mod ingress;
pub mod models;
pub mod normalize;
pub mod poll;
pub mod provider;
pub mod routes;
pub mod state;
pub mod storage;

pub use error::{Error, Result};
