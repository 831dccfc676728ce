// Domain layer - Plain data shared by every other layer
pub mod chart;
pub mod dashboard;
pub mod readings;
pub mod sensor;
pub mod telemetry;
