pub mod clean_pipeline;
pub mod etl;
pub mod filters;
pub mod parse_pipeline;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
