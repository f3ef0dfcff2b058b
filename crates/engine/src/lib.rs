pub mod orchestrator;
pub mod sampler;
