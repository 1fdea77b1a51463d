pub mod correlation;
pub mod throttle;
