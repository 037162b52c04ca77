//! Device acquisition and tuning.

use std::path::Path;
use std::sync::Arc;

use log::{error, info};

use dvbzap_conf::params::TuningParameters;
use dvbzap_conf::ExitCode;

use crate::signals::{InterruptCause, ProcessSignalState, Watchdog};
use crate::tuner::{Frontend, FrontendDevice, ReplayFile, TuneError};

/// Progress of a [`TuningSequencer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningState {
    Init,
    DeviceOpened,
    TimeoutArmed,
    Tuned,
    Failed,
}

/// Opens the front-end, arms the watchdog and tunes. No retry.
pub struct TuningSequencer<'a, F: Frontend, W: Watchdog> {
    frontend: &'a mut F,
    watchdog: &'a W,
    signals: &'a ProcessSignalState,
    state: TuningState,
}

impl<'a, F: Frontend, W: Watchdog> TuningSequencer<'a, F, W> {
    pub fn new(frontend: &'a mut F, watchdog: &'a W, signals: &'a ProcessSignalState) -> Self {
        Self {
            frontend,
            watchdog,
            signals,
            state: TuningState::Init,
        }
    }

    pub fn state(&self) -> TuningState {
        self.state
    }

    /// Run the sequence. On failure the interrupt cause is set to a tuning
    /// error and no device stays open.
    pub fn run(&mut self, params: &TuningParameters) -> Result<Arc<dyn FrontendDevice>, TuneError> {
        if let Some(path) = &params.read_file_path {
            let replay = ReplayFile::open(path).map_err(|e| self.fail(e))?;
            self.state = TuningState::DeviceOpened;
            info!("Reading from {} instead of a front-end, no tuning", path);
            self.tuned();
            return Ok(Arc::new(replay));
        }

        let mut device = self
            .frontend
            .open_device(Path::new(&params.card_dev_path), params.tuner)
            .map_err(|e| self.fail(e))?;
        self.state = TuningState::DeviceOpened;

        if self.signals.is_interrupted() {
            info!("Stop requested, closing {} before tuning", device.describe());
            drop(device);
            self.state = TuningState::Failed;
            return Err(TuneError::Interrupted);
        }

        if params.tuning_timeout > 0 {
            self.watchdog.arm(params.tuning_timeout);
            self.state = TuningState::TimeoutArmed;
        }

        if let Err(e) = self.frontend.tune(&mut device, params, self.signals) {
            drop(device);
            return Err(self.fail(e));
        }
        info!("Card {} tuned", device.describe());
        self.tuned();
        Ok(Arc::new(device))
    }

    fn tuned(&mut self) {
        self.signals.set_tuned(true);
        self.state = TuningState::Tuned;
    }

    fn fail(&mut self, e: TuneError) -> TuneError {
        error!("{}", e);
        self.state = TuningState::Failed;
        self.signals.interrupt(InterruptCause::Error(ExitCode::Tune));
        e
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io;

    use super::*;
    use crate::tuner::FrontendStatus;

    #[derive(Debug)]
    struct MockDevice;

    impl FrontendDevice for MockDevice {
        fn describe(&self) -> String {
            "mock".to_string()
        }

        fn status(&self) -> io::Result<FrontendStatus> {
            Ok(FrontendStatus::locked())
        }
    }

    #[derive(Default)]
    struct MockFrontend {
        fail_open: bool,
        fail_tune: bool,
        tune_calls: usize,
    }

    impl Frontend for MockFrontend {
        type Device = MockDevice;

        fn open_device(&mut self, dev_path: &Path, _tuner: u32) -> Result<MockDevice, TuneError> {
            if self.fail_open {
                return Err(TuneError::Open {
                    path: dev_path.to_path_buf(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
            Ok(MockDevice)
        }

        fn tune(
            &mut self,
            _device: &mut MockDevice,
            _params: &TuningParameters,
            _signals: &ProcessSignalState,
        ) -> Result<(), TuneError> {
            self.tune_calls += 1;
            if self.fail_tune {
                return Err(TuneError::Parameters("mock".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockWatchdog {
        armed: Cell<Option<u32>>,
    }

    impl Watchdog for MockWatchdog {
        fn arm(&self, secs: u32) {
            self.armed.set(Some(secs));
        }
    }

    fn params(timeout: u32) -> TuningParameters {
        TuningParameters {
            tuning_timeout: timeout,
            ..TuningParameters::default()
        }
    }

    #[test]
    fn test_successful_tune() {
        let signals = ProcessSignalState::new();
        let mut frontend = MockFrontend::default();
        let watchdog = MockWatchdog::default();
        let mut sequencer = TuningSequencer::new(&mut frontend, &watchdog, &signals);

        let device = sequencer.run(&params(5)).unwrap();
        assert_eq!(sequencer.state(), TuningState::Tuned);
        assert_eq!(device.describe(), "mock");
        assert_eq!(watchdog.armed.get(), Some(5));
        assert!(signals.is_tuned());
        assert!(!signals.is_interrupted());
    }

    #[test]
    fn test_no_timeout_no_watchdog() {
        let signals = ProcessSignalState::new();
        let mut frontend = MockFrontend::default();
        let watchdog = MockWatchdog::default();
        TuningSequencer::new(&mut frontend, &watchdog, &signals)
            .run(&params(0))
            .unwrap();
        assert_eq!(watchdog.armed.get(), None);
    }

    #[test]
    fn test_open_failure() {
        let signals = ProcessSignalState::new();
        let mut frontend = MockFrontend {
            fail_open: true,
            ..MockFrontend::default()
        };
        let watchdog = MockWatchdog::default();
        let mut sequencer = TuningSequencer::new(&mut frontend, &watchdog, &signals);

        assert!(sequencer.run(&params(5)).is_err());
        assert_eq!(sequencer.state(), TuningState::Failed);
        assert_eq!(watchdog.armed.get(), None);
        assert_eq!(
            signals.interrupted(),
            Some(InterruptCause::Error(ExitCode::Tune))
        );
        assert!(!signals.is_tuned());
        assert_eq!(frontend.tune_calls, 0);
    }

    #[test]
    fn test_tune_failure() {
        let signals = ProcessSignalState::new();
        let mut frontend = MockFrontend {
            fail_tune: true,
            ..MockFrontend::default()
        };
        let watchdog = MockWatchdog::default();
        let mut sequencer = TuningSequencer::new(&mut frontend, &watchdog, &signals);

        assert!(sequencer.run(&params(5)).is_err());
        assert_eq!(sequencer.state(), TuningState::Failed);
        assert_eq!(
            signals.interrupted(),
            Some(InterruptCause::Error(ExitCode::Tune))
        );
    }

    #[test]
    fn test_stop_requested_before_tuning() {
        let signals = ProcessSignalState::new();
        signals.interrupt(InterruptCause::Signal(nix::libc::SIGTERM));
        let mut frontend = MockFrontend::default();
        let watchdog = MockWatchdog::default();
        let mut sequencer = TuningSequencer::new(&mut frontend, &watchdog, &signals);

        assert!(matches!(
            sequencer.run(&params(5)),
            Err(TuneError::Interrupted)
        ));
        assert_eq!(sequencer.state(), TuningState::Failed);
        assert_eq!(watchdog.armed.get(), None);
        assert_eq!(
            signals.interrupted(),
            Some(InterruptCause::Signal(nix::libc::SIGTERM))
        );
        assert!(!signals.is_tuned());
        assert_eq!(frontend.tune_calls, 0);
    }

    #[test]
    fn test_replay_skips_tuning() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let signals = ProcessSignalState::new();
        let mut frontend = MockFrontend::default();
        let watchdog = MockWatchdog::default();
        let mut params = params(5);
        params.read_file_path = Some(file.path().to_string_lossy().into_owned());

        let mut sequencer = TuningSequencer::new(&mut frontend, &watchdog, &signals);
        sequencer.run(&params).unwrap();
        assert_eq!(sequencer.state(), TuningState::Tuned);
        assert!(signals.is_tuned());
        assert_eq!(watchdog.armed.get(), None);
        assert_eq!(frontend.tune_calls, 0);
    }
}
