pub mod blocking_handoff;
pub mod fan_out;
pub mod request_pipeline;
