//! Domain types for the backend's resources.

pub mod job;
pub mod sensor;

pub use job::{FixedJob, JobStatus, JobValidationError, NewFixedJob};
pub use sensor::{LatLon, Sensor, SensorLocations, SensorStatus};
