pub mod chart;
pub mod config;
pub mod dimension;
pub mod error;
pub mod group;
pub mod parse;
pub mod table;
pub mod util;

pub use error::{Error, Result};
