// src/config/mod.rs
pub mod tips;

pub use tips::{load_tips_config_default, load_tips_config_from, TipsConfig};
