#[macro_use] extern crate rocket;
#[macro_use] extern crate serde_derive;

pub mod config;
pub mod error;
pub mod export;
pub mod sequence;
pub mod server;
pub mod session;
pub mod timestamp;

#[cfg(test)]
mod test_utils;

pub use self::error::{Error, Result};
pub use self::server::{build, build_with};
