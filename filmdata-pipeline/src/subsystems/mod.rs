pub mod artifact;
pub mod pipeline;
pub mod predict;
pub mod train;
