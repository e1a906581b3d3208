pub mod config;
pub mod document;
pub mod markup;
pub mod mention;

pub use config::*;
pub use document::*;
pub use mention::*;
