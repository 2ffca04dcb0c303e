pub mod types;
pub mod error;
pub mod config;
pub mod feed;
pub mod rates;
pub mod store;
pub mod pipeline;
pub mod utils;

pub use types::*;
pub use error::{FxError, Result};
