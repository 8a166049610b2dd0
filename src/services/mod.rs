pub mod cache;
pub mod insights;
pub mod logger;
pub mod model;
pub mod postprocess;
pub mod registry;
pub mod secrets;
pub mod transport;
