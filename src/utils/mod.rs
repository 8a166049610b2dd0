pub mod auth;
pub mod endpoint;
pub mod json_repair;
pub mod params;
pub mod payload;
pub mod redact;
pub mod summary;
pub mod text;
