// Domain layer - Telemetry models and their invariants
pub mod alert;
pub mod anomaly;
pub mod harmonic;
pub mod liveness;
pub mod prediction;
pub mod sample;
pub mod window;
