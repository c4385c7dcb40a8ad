pub mod bump;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod event;
pub mod git;
pub mod output;
pub mod sequencer;
pub mod strategy;
pub mod telemetry;

pub use error::{ReleaseError, Result};
