//! dvbzap - DVB front-end startup orchestrator.
//!
//! Reads a configuration, tunes a front-end, hands it to the engine and
//! releases everything through a single shutdown path.

pub mod context;
pub mod engine;
pub mod lists;
pub mod logging;
pub mod orchestrator;
pub mod sequencer;
pub mod shutdown;
pub mod signals;
pub mod tuner;

pub use context::Cli;
pub use engine::{Engine, EngineHandoff, HoldEngine};
pub use orchestrator::{Orchestrator, OrchestratorError};
pub use signals::{InterruptCause, ProcessSignalState, SignalSupervisor};
pub use tuner::{DvbFrontend, Frontend, FrontendDevice};
