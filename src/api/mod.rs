//! REST API client module for the sensor management backend.
//!
//! Layered in two pieces: `resource` is the policy core (credential
//! attachment plus refresh-once-retry-once on 401), `client` is the typed
//! surface over the backend's job and sensor routes. `transport` is the
//! injectable HTTP seam between them and reqwest.

pub mod client;
pub mod error;
pub mod resource;
pub mod transport;

pub use client::SensorApi;
pub use error::Failure;
pub use resource::{Outcome, RequestDescriptor, ResourceClient};
pub use transport::{HttpTransport, Method, Transport, TransportResponse};
