pub mod cli;
pub mod client;
pub mod error;
pub mod loader;
pub mod model;
pub mod output;
pub mod serialization;
pub mod types;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
