pub mod artifact_store;
pub mod model;
pub mod pipeline;
pub mod queue;
pub mod status_store;
