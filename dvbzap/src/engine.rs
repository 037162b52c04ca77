//! Hand-off of the tuned front-end to the streaming engine.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};
use nix::libc;
use thiserror::Error;

use dvbzap_conf::{ExitCode, ParameterStore, Readiness};

use crate::lists::{create_lists, ChannelListPaths};
use crate::logging::LogFileSink;
use crate::signals::ProcessSignalState;
use crate::tuner::FrontendDevice;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const SIGNAL_POWER_INTERVAL: Duration = Duration::from_secs(1);

/// Everything the engine gets once tuning succeeded.
#[derive(Clone)]
pub struct EngineHandoff {
    /// Resolved parameters, channel table frozen.
    pub params: Arc<ParameterStore>,
    pub device: Arc<dyn FrontendDevice>,
    pub log_sink: LogFileSink,
    pub list_paths: ChannelListPaths,
    /// Cleared when the channel lists could not be created at startup.
    pub write_streamed_channels: bool,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cannot start the {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::Generic
    }
}

/// Runs with the tuned front-end until the process is interrupted.
pub trait Engine {
    /// Returns the threads still running, for shutdown to join.
    fn run(
        &mut self,
        handoff: EngineHandoff,
        signals: &'static ProcessSignalState,
    ) -> Result<Vec<JoinHandle<()>>, EngineError>;
}

/// Keeps the front-end tuned and answers the advisory signals.
#[derive(Debug, Default)]
pub struct HoldEngine {
    exit_after_tune: bool,
    show_signal: bool,
}

impl HoldEngine {
    pub fn new(exit_after_tune: bool, show_signal: bool) -> Self {
        Self {
            exit_after_tune,
            show_signal,
        }
    }

    fn on_advisory(&self, signum: i32, handoff: &EngineHandoff) {
        match signum {
            libc::SIGUSR1 => log_status(handoff.device.as_ref()),
            libc::SIGUSR2 => {
                log_channels(&handoff.params);
                if handoff.write_streamed_channels {
                    create_lists(&handoff.list_paths, &handoff.params);
                }
            }
            libc::SIGHUP => {
                info!("SIGHUP received, reopening the log file");
                if let Err(e) = handoff.log_sink.reopen() {
                    warn!("Cannot reopen log file: {}", e);
                }
            }
            _ => {}
        }
    }
}

fn log_status(device: &dyn FrontendDevice) {
    match device.status() {
        Ok(status) => info!("{}: {}", device.describe(), status),
        Err(e) => warn!("{}: cannot read status: {}", device.describe(), e),
    }
}

fn log_channels(params: &ParameterStore) {
    let channels = &params.channels;
    let ready = channels
        .iter()
        .filter(|c| c.readiness == Readiness::Ready)
        .count();
    info!(
        "{} channel(s), {} streamed",
        channels.number_of_channels().unwrap_or(channels.len()),
        ready
    );
    for (idx, channel) in channels.iter().enumerate() {
        info!(
            "Channel {:3} \"{}\" {:?} pids {:?}",
            idx, channel.name, channel.readiness, channel.pids
        );
    }
}

fn spawn_signal_power(
    device: Arc<dyn FrontendDevice>,
    signals: &'static ProcessSignalState,
) -> Result<JoinHandle<()>, EngineError> {
    let name = "signal-power";
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let ticks = SIGNAL_POWER_INTERVAL.as_millis() / POLL_INTERVAL.as_millis();
            let mut tick = 0;
            while !signals.is_interrupted() {
                if tick == 0 {
                    log_status(device.as_ref());
                }
                tick = (tick + 1) % ticks;
                thread::sleep(POLL_INTERVAL);
            }
        })
        .map_err(|source| EngineError::Spawn { name, source })
}

impl Engine for HoldEngine {
    fn run(
        &mut self,
        handoff: EngineHandoff,
        signals: &'static ProcessSignalState,
    ) -> Result<Vec<JoinHandle<()>>, EngineError> {
        if self.exit_after_tune {
            info!("Tuned, exiting as requested");
            return Ok(Vec::new());
        }

        let mut threads = Vec::new();
        if self.show_signal {
            threads.push(spawn_signal_power(Arc::clone(&handoff.device), signals)?);
        }

        info!("Holding {}", handoff.device.describe());
        if !handoff.write_streamed_channels {
            info!("Channel lists will not be refreshed");
        }
        while !signals.is_interrupted() {
            if let Some(signum) = signals.take_received_signal() {
                self.on_advisory(signum, &handoff);
            }
            thread::sleep(POLL_INTERVAL);
        }
        Ok(threads)
    }
}
