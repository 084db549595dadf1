pub mod cache;
pub mod cli;
pub mod config;
pub mod flock;
pub mod git;
pub mod loader;
pub mod model;
pub mod process;
pub mod reclaim;
pub mod resolver;

mod api;

pub use api::{Gimport, GimportBuilder, ImportError, ImportOptions, Imported};
