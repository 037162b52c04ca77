//! Configuration file parsing and parameter resolution for dvbzap.
//!
//! A configuration is read line by line by a [`ConfigDispatcher`] into a
//! [`ParameterStore`], then made consistent by [`resolve`].

pub mod channel;
pub mod dispatcher;
pub mod error;
pub mod params;
pub mod resolver;
pub mod sections;
pub mod template;
pub mod tokens;
pub mod tristate;

pub use channel::{ChannelEntry, ChannelTable, Readiness};
pub use dispatcher::{ConfigDispatcher, LineOutcome};
pub use error::{ConfigError, ExitCode};
pub use params::ParameterStore;
pub use resolver::resolve;
pub use template::TemplateValues;
pub use tristate::Tristate;
