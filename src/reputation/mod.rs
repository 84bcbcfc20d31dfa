//! File and URL reputation checks backed by VirusTotal.

mod client;
mod config;
mod error;
mod verdict;

pub use client::*;
pub use config::*;
pub use error::*;
pub use verdict::*;
