pub mod phases;
pub mod sessions;
pub mod stats;
