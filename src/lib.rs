//! ffqueue
//!
//! Directory-backed transcoding queue: files dropped into `queue/` are run
//! through an external transcoder one at a time and land in `finished/`.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod job;
pub mod observability;
pub mod pipeline;
pub mod queue;
pub mod shutdown;
pub mod topology;
pub mod watcher;
pub mod worker;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::Pipeline;
