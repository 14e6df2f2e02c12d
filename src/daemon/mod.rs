pub mod start;
pub mod timer;
