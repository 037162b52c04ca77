//! The single release point of the process.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, error, info, warn};

use dvbzap_conf::ExitCode;

use crate::signals::{InterruptCause, ProcessSignalState};
use crate::tuner::FrontendDevice;

/// Resources acquired during startup, released by [`Shutdown::close`].
#[derive(Default)]
pub struct Shutdown {
    device: Option<Arc<dyn FrontendDevice>>,
    files: Vec<PathBuf>,
    pid_file: Option<PathBuf>,
    threads: Vec<JoinHandle<()>>,
    closed: AtomicBool,
    status: i32,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_device(&mut self, device: Arc<dyn FrontendDevice>) {
        self.device = Some(device);
    }

    pub fn register_files(&mut self, files: impl IntoIterator<Item = PathBuf>) {
        self.files.extend(files);
    }

    pub fn register_pid_file(&mut self, path: PathBuf) {
        self.pid_file = Some(path);
    }

    pub fn register_threads(&mut self, threads: impl IntoIterator<Item = JoinHandle<()>>) {
        self.threads.extend(threads);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Release everything and return the process exit status.
    ///
    /// Later calls do nothing and return the same status.
    pub fn close(&mut self, signals: &ProcessSignalState) -> i32 {
        if self.closed.swap(true, Ordering::SeqCst) {
            return self.status;
        }

        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("unnamed").to_string();
            if handle.join().is_err() {
                warn!("Thread {} panicked", name);
            }
        }

        if let Some(device) = self.device.take() {
            debug!("Closing {}", device.describe());
        }

        for file in self.files.drain(..) {
            remove_generated(&file, signals);
        }
        if let Some(pid_file) = self.pid_file.take() {
            remove_generated(&pid_file, signals);
        }

        self.status = match signals.interrupted() {
            Some(InterruptCause::Signal(signum)) => {
                info!("Caught signal {} - closing cleanly.", signum);
                0
            }
            Some(InterruptCause::Error(code)) => {
                info!("Closing cleanly. Error {}", code.code());
                code.code()
            }
            None => {
                info!("Closing cleanly.");
                0
            }
        };
        self.status
    }
}

fn remove_generated(path: &Path, signals: &ProcessSignalState) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            error!("{}: {}", path.display(), e);
            signals.interrupt(InterruptCause::Error(ExitCode::DelFile));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::thread;

    use super::*;
    use crate::tuner::FrontendStatus;

    #[derive(Debug)]
    struct NullDevice;

    impl FrontendDevice for NullDevice {
        fn describe(&self) -> String {
            "null".to_string()
        }

        fn status(&self) -> io::Result<FrontendStatus> {
            Ok(FrontendStatus::default())
        }
    }

    #[test]
    fn test_close_releases_everything() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("channels_streamed_adapter0_tuner0");
        let pid = dir.path().join("dvbzap.pid");
        File::create(&list).unwrap();
        File::create(&pid).unwrap();

        let device: Arc<dyn FrontendDevice> = Arc::new(NullDevice);
        let signals = ProcessSignalState::new();
        let mut shutdown = Shutdown::new();
        shutdown.register_device(Arc::clone(&device));
        shutdown.register_files([list.clone()]);
        shutdown.register_pid_file(pid.clone());
        shutdown.register_threads([thread::spawn(|| {})]);

        assert_eq!(shutdown.close(&signals), 0);
        assert!(!list.exists());
        assert!(!pid.exists());
        assert_eq!(Arc::strong_count(&device), 1);
    }

    #[test]
    fn test_close_twice() {
        let signals = ProcessSignalState::new();
        signals.interrupt(InterruptCause::Error(ExitCode::Tune));
        let mut shutdown = Shutdown::new();
        assert_eq!(shutdown.close(&signals), ExitCode::Tune.code());
        assert!(shutdown.is_closed());

        signals.reset();
        assert_eq!(shutdown.close(&signals), ExitCode::Tune.code());
    }

    #[test]
    fn test_signal_exit_status() {
        let signals = ProcessSignalState::new();
        signals.interrupt(InterruptCause::Signal(nix::libc::SIGINT));
        assert_eq!(Shutdown::new().close(&signals), 0);
    }

    #[test]
    fn test_missing_files_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let signals = ProcessSignalState::new();
        let mut shutdown = Shutdown::new();
        shutdown.register_files([dir.path().join("never_created")]);
        assert_eq!(shutdown.close(&signals), 0);
        assert!(!signals.is_interrupted());
    }
}
