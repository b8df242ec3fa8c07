pub mod config;
pub mod release;
pub mod tracker;
