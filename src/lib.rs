pub mod config;
pub mod memory;
pub mod run_wrapper;

pub mod error;
