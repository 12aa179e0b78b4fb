pub mod dashboard;
pub mod phase;
