pub mod pipeline;
pub mod summary;
