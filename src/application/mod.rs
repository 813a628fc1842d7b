// Application layer - Pipeline use cases and the channel port
pub mod alert_engine;
pub mod control_policy;
pub mod harmonic_estimator;
pub mod noise;
pub mod pipeline;
pub mod pipeline_service;
pub mod prediction_estimator;
pub mod telemetry_channel;
