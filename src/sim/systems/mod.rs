pub mod flocking;
pub mod drift;
pub mod alerts;
pub mod telemetry;
