pub mod dispatcher;
pub mod executor;
pub mod pipeline;
