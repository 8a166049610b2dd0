mod pipeline_error;
mod transport_error;

pub use pipeline_error::{ErrorKind, PipelineError};
pub use transport_error::TransportFailure;
