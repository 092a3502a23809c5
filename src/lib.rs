pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod draft;
pub mod error;
pub mod events;
pub mod intake;
pub mod job;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod script;
pub mod services;
pub mod timezone;
pub mod util;

pub use error::{CoreError, CoreResult};
