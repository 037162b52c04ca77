//! Startup sequence: configuration, tuning, hand-off, shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};
use thiserror::Error;

use dvbzap_conf::{resolve, ConfigDispatcher, ConfigError, ExitCode, ParameterStore};

use crate::context::Cli;
use crate::engine::{Engine, EngineError, EngineHandoff};
use crate::lists::{create_lists, write_pid_file, ChannelListPaths};
use crate::logging::LogFileSink;
use crate::sequencer::TuningSequencer;
use crate::shutdown::Shutdown;
use crate::signals::{InterruptCause, ProcessSignalState, Watchdog};
use crate::tuner::{Frontend, TuneError};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tune(#[from] TuneError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Cannot create {}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OrchestratorError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            OrchestratorError::Config(e) => e.exit_code(),
            OrchestratorError::Tune(e) => e.exit_code(),
            OrchestratorError::Engine(e) => e.exit_code(),
            OrchestratorError::CreateFile { .. } => ExitCode::CreateFile,
        }
    }
}

/// Drives one process lifetime.
pub struct Orchestrator<F: Frontend, W: Watchdog, E: Engine> {
    cli: Cli,
    frontend: F,
    watchdog: W,
    engine: E,
    signals: &'static ProcessSignalState,
    log_sink: LogFileSink,
    shutdown: Shutdown,
}

impl<F: Frontend, W: Watchdog, E: Engine> Orchestrator<F, W, E> {
    pub fn new(
        cli: Cli,
        frontend: F,
        watchdog: W,
        engine: E,
        signals: &'static ProcessSignalState,
        log_sink: LogFileSink,
    ) -> Self {
        Self {
            cli,
            frontend,
            watchdog,
            engine,
            signals,
            log_sink,
            shutdown: Shutdown::new(),
        }
    }

    /// Run until the engine stops or a step fails, release everything and
    /// return the process exit status.
    pub fn start(mut self) -> i32 {
        if let Err(e) = self.run() {
            error!("{}", e);
            self.signals.interrupt(InterruptCause::Error(e.exit_code()));
        }
        self.shutdown.close(self.signals)
    }

    fn load_parameters(&self) -> Result<ParameterStore, OrchestratorError> {
        let mut store = ParameterStore::new();
        if let Some(path) = &self.cli.config {
            ConfigDispatcher::new().parse_file(&mut store, path)?;
        }
        store.channels.freeze();
        self.cli.apply_overrides(&mut store);
        resolve(&mut store)?;
        Ok(store)
    }

    /// A terminating signal arrived; nothing more is acquired.
    fn stop_requested(&self) -> bool {
        let stop = self.signals.is_interrupted();
        if stop {
            info!("Stop requested, skipping the remaining startup steps");
        }
        stop
    }

    fn run(&mut self) -> Result<(), OrchestratorError> {
        let store = self.load_parameters()?;

        if let Some(log_file) = &store.logging.log_file {
            if let Err(e) = self.log_sink.attach(log_file) {
                warn!("Cannot open log file {}: {}", log_file, e);
            }
        }
        info!(
            "========== End of configuration, dvbzap version {} is starting ==========",
            env!("CARGO_PKG_VERSION")
        );

        if self.stop_requested() {
            return Ok(());
        }

        let tuned =
            TuningSequencer::new(&mut self.frontend, &self.watchdog, self.signals).run(&store.tuning);
        let device = match tuned {
            Ok(device) => device,
            Err(TuneError::Interrupted) if self.signals.is_interrupted() => {
                info!("Stop requested while tuning, skipping the remaining startup steps");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        self.shutdown.register_device(Arc::clone(&device));
        if self.stop_requested() {
            return Ok(());
        }

        if self.cli.daemon {
            let path = PathBuf::from(&store.engine.filename_pid);
            write_pid_file(&path).map_err(|source| OrchestratorError::CreateFile {
                path: path.clone(),
                source,
            })?;
            self.shutdown.register_pid_file(path);
        }

        let paths = ChannelListPaths::new(
            &self.cli.run_dir,
            store.tuning.card.unwrap_or_default(),
            store.tuning.tuner,
            store.cam.cam_support,
        );
        let lists = create_lists(&paths, &store);
        self.shutdown.register_files(lists.created);
        if !lists.write_streamed_channels {
            warn!("Channel lists are not writable, they will not be refreshed");
        }

        let handoff = EngineHandoff {
            params: Arc::new(store),
            device,
            log_sink: self.log_sink.clone(),
            list_paths: paths,
            write_streamed_channels: lists.write_streamed_channels,
        };
        let threads = self.engine.run(handoff, self.signals)?;
        self.shutdown.register_threads(threads);
        Ok(())
    }
}
