pub mod advisor;
pub mod config;
pub mod error;
pub mod geometry;
pub mod iot;
pub mod mission;
pub mod rover;
pub mod sensor;
pub mod station;
pub mod store;
pub mod util;
pub mod vehicle;
