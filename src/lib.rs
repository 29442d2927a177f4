//! sensordeck - client library for the sensor management system API.
//!
//! The core is [`api::ResourceClient`]: an authenticated resource client
//! that attaches the ambient session credential to each request and, on a
//! 401, refreshes the session exactly once and retries the original request
//! exactly once. [`api::SensorApi`] builds the typed job/sensor surface on
//! top of it; [`auth`] owns the credential lifecycle.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod models;
pub mod utils;
