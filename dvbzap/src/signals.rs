//! Signal handling and the tuning watchdog.
//!
//! Handlers only touch the atomics of a [`ProcessSignalState`]. The one
//! exception is the tuning timeout, which writes a line to stderr and
//! terminates the process on the spot.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicPtr, Ordering};

use log::debug;
use nix::libc;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use thiserror::Error;

use dvbzap_conf::ExitCode;

/// Why the process is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptCause {
    /// A terminating signal was caught.
    Signal(i32),
    /// A fatal error.
    Error(ExitCode),
}

impl InterruptCause {
    /// Pack the cause into one word: `code << 8` for errors, the signal
    /// number for signals.
    pub fn encode(self) -> i32 {
        match self {
            InterruptCause::Signal(signum) => signum,
            InterruptCause::Error(code) => code.code() << 8,
        }
    }

    /// Inverse of [`encode`](Self::encode); `0` means no cause.
    pub fn decode(word: i32) -> Option<Self> {
        if word == 0 {
            None
        } else if word & 0xff == 0 {
            Some(InterruptCause::Error(
                ExitCode::from_code(word >> 8).unwrap_or(ExitCode::Generic),
            ))
        } else {
            Some(InterruptCause::Signal(word))
        }
    }

    /// Status reported to the parent process. A signal cause exits with 0,
    /// the signal number only shows up in the log.
    pub fn exit_status(self) -> i32 {
        match self {
            InterruptCause::Signal(_) => 0,
            InterruptCause::Error(code) => code.code(),
        }
    }
}

/// What a signal handler did with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDisposition {
    /// The front-end did not lock in time.
    TuningTimeout,
    /// Nothing to do.
    Ignored,
    /// Stored for the engine to pick up.
    Advisory,
    /// Recorded as the interrupt cause.
    Interrupt,
}

/// Flags shared between signal handlers and the rest of the process.
#[derive(Debug, Default)]
pub struct ProcessSignalState {
    interrupted: AtomicI32,
    received_signal: AtomicI32,
    card_tuned: AtomicBool,
}

impl ProcessSignalState {
    pub const fn new() -> Self {
        Self {
            interrupted: AtomicI32::new(0),
            received_signal: AtomicI32::new(0),
            card_tuned: AtomicBool::new(false),
        }
    }

    /// Record `cause` unless a cause is already set. Returns whether it was recorded.
    pub fn interrupt(&self, cause: InterruptCause) -> bool {
        self.interrupted
            .compare_exchange(0, cause.encode(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn interrupted(&self) -> Option<InterruptCause> {
        InterruptCause::decode(self.interrupted.load(Ordering::SeqCst))
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst) != 0
    }

    pub fn set_tuned(&self, tuned: bool) {
        self.card_tuned.store(tuned, Ordering::SeqCst);
    }

    pub fn is_tuned(&self) -> bool {
        self.card_tuned.load(Ordering::SeqCst)
    }

    pub fn record_signal(&self, signum: i32) {
        self.received_signal.store(signum, Ordering::SeqCst);
    }

    /// Advisory signal received since the last call, if any.
    pub fn take_received_signal(&self) -> Option<i32> {
        match self.received_signal.swap(0, Ordering::SeqCst) {
            0 => None,
            signum => Some(signum),
        }
    }

    /// Clear every flag.
    pub fn reset(&self) {
        self.interrupted.store(0, Ordering::SeqCst);
        self.received_signal.store(0, Ordering::SeqCst);
        self.card_tuned.store(false, Ordering::SeqCst);
    }

    /// Apply the transition for `signum`. Async-signal-safe.
    pub fn handle(&self, signum: i32) -> SignalDisposition {
        match signum {
            libc::SIGALRM => {
                if self.is_interrupted() || self.is_tuned() {
                    SignalDisposition::Ignored
                } else {
                    SignalDisposition::TuningTimeout
                }
            }
            libc::SIGUSR1 | libc::SIGUSR2 | libc::SIGHUP => {
                self.record_signal(signum);
                SignalDisposition::Advisory
            }
            libc::SIGPIPE => SignalDisposition::Ignored,
            _ => {
                self.interrupt(InterruptCause::Signal(signum));
                SignalDisposition::Interrupt
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Cannot install handler for {signal}: {source}")]
    Install {
        signal: Signal,
        #[source]
        source: nix::Error,
    },
}

impl SignalError {
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::Generic
    }
}

/// Signals caught by the supervisor.
pub const HANDLED_SIGNALS: [Signal; 8] = [
    Signal::SIGALRM,
    Signal::SIGUSR1,
    Signal::SIGUSR2,
    Signal::SIGHUP,
    Signal::SIGPIPE,
    Signal::SIGINT,
    Signal::SIGTERM,
    Signal::SIGQUIT,
];

static STATE: AtomicPtr<ProcessSignalState> = AtomicPtr::new(std::ptr::null_mut());

const TIMEOUT_MSG: &[u8] = b"dvbzap: Card not tuned after timeout - exiting\n";

extern "C" fn on_signal(signum: libc::c_int) {
    let state = STATE.load(Ordering::SeqCst);
    if state.is_null() {
        return;
    }
    // SAFETY: the pointer comes from a `&'static ProcessSignalState`.
    let state = unsafe { &*state };
    if state.handle(signum) == SignalDisposition::TuningTimeout {
        let _ = nix::unistd::write(std::io::stderr(), TIMEOUT_MSG);
        // SAFETY: _exit is async-signal-safe and never returns.
        unsafe { libc::_exit(ExitCode::Tune.code()) }
    }
}

/// Installs the process signal handlers.
pub struct SignalSupervisor {
    state: &'static ProcessSignalState,
}

impl SignalSupervisor {
    /// Route [`HANDLED_SIGNALS`] to `state`. Signals the parent asked us to
    /// ignore stay ignored.
    pub fn install(state: &'static ProcessSignalState) -> Result<Self, SignalError> {
        STATE.store(
            state as *const ProcessSignalState as *mut ProcessSignalState,
            Ordering::SeqCst,
        );

        let action = SigAction::new(
            SigHandler::Handler(on_signal),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        for signal in HANDLED_SIGNALS {
            // SAFETY: the handler only performs async-signal-safe operations.
            let previous = unsafe { sigaction(signal, &action) }
                .map_err(|source| SignalError::Install { signal, source })?;
            if previous.handler() == SigHandler::SigIgn {
                let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
                // SAFETY: restoring SIG_IGN installs no code.
                unsafe { sigaction(signal, &ignore) }
                    .map_err(|source| SignalError::Install { signal, source })?;
                debug!("{} stays ignored", signal);
            }
        }
        Ok(Self { state })
    }

    pub fn state(&self) -> &'static ProcessSignalState {
        self.state
    }
}

/// Single-shot timer that fires SIGALRM.
pub trait Watchdog {
    fn arm(&self, secs: u32);
}

/// [`Watchdog`] backed by `alarm(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlarmWatchdog;

impl Watchdog for AlarmWatchdog {
    fn arm(&self, secs: u32) {
        // Replaces any pending alarm.
        let _ = nix::unistd::alarm::set(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        for cause in [
            InterruptCause::Signal(libc::SIGINT),
            InterruptCause::Signal(libc::SIGTERM),
            InterruptCause::Error(ExitCode::Conf),
            InterruptCause::Error(ExitCode::Tune),
            InterruptCause::Error(ExitCode::Generic),
        ] {
            assert_eq!(InterruptCause::decode(cause.encode()), Some(cause));
        }
        assert_eq!(InterruptCause::Error(ExitCode::Tune).encode(), 7 << 8);
        assert_eq!(InterruptCause::decode(0), None);
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(InterruptCause::Signal(libc::SIGTERM).exit_status(), 0);
        assert_eq!(InterruptCause::Signal(libc::SIGINT).exit_status(), 0);
        assert_eq!(InterruptCause::Error(ExitCode::ConfFile).exit_status(), 2);
    }

    #[test]
    fn test_first_cause_wins() {
        let state = ProcessSignalState::new();
        assert!(state.interrupt(InterruptCause::Error(ExitCode::Tune)));
        assert!(!state.interrupt(InterruptCause::Signal(libc::SIGINT)));
        assert_eq!(
            state.interrupted(),
            Some(InterruptCause::Error(ExitCode::Tune))
        );
    }

    #[test]
    fn test_alarm_before_and_after_tuning() {
        let state = ProcessSignalState::new();
        assert_eq!(
            state.handle(libc::SIGALRM),
            SignalDisposition::TuningTimeout
        );

        state.set_tuned(true);
        assert_eq!(state.handle(libc::SIGALRM), SignalDisposition::Ignored);
        assert!(!state.is_interrupted());

        state.reset();
        state.interrupt(InterruptCause::Signal(libc::SIGTERM));
        assert_eq!(state.handle(libc::SIGALRM), SignalDisposition::Ignored);
    }

    #[test]
    fn test_advisory_signals() {
        let state = ProcessSignalState::new();
        for signum in [libc::SIGUSR1, libc::SIGUSR2, libc::SIGHUP] {
            assert_eq!(state.handle(signum), SignalDisposition::Advisory);
            assert_eq!(state.take_received_signal(), Some(signum));
            assert_eq!(state.take_received_signal(), None);
        }
        assert!(!state.is_interrupted());
    }

    #[test]
    fn test_sigpipe_ignored() {
        let state = ProcessSignalState::new();
        assert_eq!(state.handle(libc::SIGPIPE), SignalDisposition::Ignored);
        assert!(!state.is_interrupted());
        assert_eq!(state.take_received_signal(), None);
    }

    #[test]
    fn test_other_signals_interrupt() {
        let state = ProcessSignalState::new();
        assert_eq!(state.handle(libc::SIGTERM), SignalDisposition::Interrupt);
        assert_eq!(
            state.interrupted(),
            Some(InterruptCause::Signal(libc::SIGTERM))
        );
    }
}
