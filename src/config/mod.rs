// src/config/mod.rs
pub mod slurper;

pub use slurper::{SlurperConfig, TwitterCredentials, WikiSource};
