pub mod config;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod render;
pub mod source;
pub mod stats;
pub mod tidy;
