pub mod builtin;
pub mod config;
pub mod eval;
pub mod global;
pub mod job;
pub mod parser;
pub mod search;
pub mod types;

pub use config::Config;
pub use global::{Flow,Session};
