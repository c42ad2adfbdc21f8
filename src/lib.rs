pub mod config;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod normalize;
pub mod pipeline;
pub mod retry;
pub mod source;
pub mod storage;
pub mod types;
