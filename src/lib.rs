pub mod batch;
pub mod cli;
pub mod confidence;
pub mod config;
pub mod engine;
pub mod error;
pub mod kind;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod postprocess;
pub mod preprocess;
pub mod probe;
pub mod render;
pub mod report;
pub mod request;
pub mod util;

pub use error::ConversionError;
pub use pipeline::Converter;
pub use report::{BatchSummary, ConversionResult};
pub use request::ConversionRequest;
