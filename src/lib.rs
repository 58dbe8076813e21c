pub mod config;
pub mod core;
pub mod domain;
pub mod java;
pub mod openapi;
pub mod utils;

pub use config::cli::LocalStorage;
pub use config::toml_config::RulesConfig;
#[cfg(feature = "cli")]
pub use config::{CliConfig, Stage};

pub use core::{clean_pipeline::CleanPipeline, etl::EtlEngine, parse_pipeline::ParsePipeline};
pub use utils::error::{Result, TidyError};
