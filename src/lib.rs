pub mod adapter;
pub mod batch;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod html;
pub mod report;
pub mod util;
pub mod word;

pub use adapter::Adapter;
pub use error::{ConvertError, ConvertResult, ErrorKind};
