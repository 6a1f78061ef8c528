pub mod config_service;
pub mod json_qa_cache;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_qa_cache::JsonQaCache;
pub use crate::paths::ParleyPaths;
