//! DVB front-end access.
//!
//! [`Frontend`] opens and tunes a front-end; the opened handle is then shared
//! with the engine as a [`FrontendDevice`]. A recorded stream can stand in for
//! a front-end through [`ReplayFile`].

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use colored::Colorize;
use thiserror::Error;

use dvbzap_conf::params::TuningParameters;
use dvbzap_conf::ExitCode;

use crate::signals::ProcessSignalState;

#[cfg(target_os = "linux")]
pub use self::linux::{frontend_info, DvbDevice, DvbFrontend};
#[cfg(not(target_os = "linux"))]
pub use self::unsupported::{frontend_info, DvbDevice, DvbFrontend};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod unsupported;

pub const FE_HAS_SIGNAL: u32 = 0x01;
pub const FE_HAS_CARRIER: u32 = 0x02;
pub const FE_HAS_VITERBI: u32 = 0x04;
pub const FE_HAS_SYNC: u32 = 0x08;
pub const FE_HAS_LOCK: u32 = 0x10;

#[derive(Debug, Error)]
pub enum TuneError {
    #[error("Cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Front-end I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Bad tuning parameters: {0}")]
    Parameters(String),
    #[error("Interrupted before the front-end was tuned")]
    Interrupted,
}

impl TuneError {
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::Tune
    }
}

/// Snapshot of `FE_READ_STATUS` plus the optional quality readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontendStatus {
    pub flags: u32,
    pub strength: Option<u16>,
    pub snr: Option<u16>,
}

impl FrontendStatus {
    pub fn locked() -> Self {
        Self {
            flags: FE_HAS_SIGNAL | FE_HAS_CARRIER | FE_HAS_VITERBI | FE_HAS_SYNC | FE_HAS_LOCK,
            ..Self::default()
        }
    }

    pub fn has_lock(&self) -> bool {
        self.flags & FE_HAS_LOCK != 0
    }
}

impl fmt::Display for FrontendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (FE_HAS_SIGNAL, "SIGNAL"),
            (FE_HAS_CARRIER, "CARRIER"),
            (FE_HAS_VITERBI, "VITERBI"),
            (FE_HAS_SYNC, "SYNC"),
            (FE_HAS_LOCK, "LOCK"),
        ];
        let set: Vec<_> = names
            .iter()
            .filter(|(bit, _)| self.flags & bit != 0)
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "no signal")?;
        } else {
            write!(f, "{}", set.join(" | "))?;
        }
        if let Some(strength) = self.strength {
            write!(f, ", strength {}", strength)?;
        }
        if let Some(snr) = self.snr {
            write!(f, ", snr {}", snr)?;
        }
        Ok(())
    }
}

/// An opened source of transport stream.
pub trait FrontendDevice: Send + Sync + fmt::Debug {
    /// Human-readable name for the logs.
    fn describe(&self) -> String;
    fn status(&self) -> io::Result<FrontendStatus>;
}

/// Opens and tunes front-ends.
pub trait Frontend {
    type Device: FrontendDevice + 'static;

    /// Open front-end `tuner` of the adapter directory `dev_path`.
    fn open_device(&mut self, dev_path: &Path, tuner: u32) -> Result<Self::Device, TuneError>;

    /// Program the front-end and wait for the lock. Gives up when `signals`
    /// reports an interrupt.
    fn tune(
        &mut self,
        device: &mut Self::Device,
        params: &TuningParameters,
        signals: &ProcessSignalState,
    ) -> Result<(), TuneError>;
}

/// Recorded transport stream used instead of a front-end.
#[derive(Debug)]
pub struct ReplayFile {
    path: PathBuf,
    _file: File,
}

impl ReplayFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TuneError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TuneError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }
}

impl FrontendDevice for ReplayFile {
    fn describe(&self) -> String {
        format!("replay of {}", self.path.display())
    }

    fn status(&self) -> io::Result<FrontendStatus> {
        Ok(FrontendStatus::locked())
    }
}

/// Path of front-end `tuner` under the adapter directory `dev_path`.
pub fn frontend_path(dev_path: &Path, tuner: u32) -> PathBuf {
    dev_path.join(format!("frontend{}", tuner))
}

/// A front-end found by [`list_cards`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    pub card: u32,
    pub tuner: u32,
    pub path: PathBuf,
    /// Name and type reported by the driver, when the device could be queried.
    pub info: Option<(String, &'static str)>,
}

fn numbered(name: &str, prefix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?.parse().ok()
}

/// Enumerate `<root>/adapterN/frontendM`, sorted by card then tuner.
pub fn list_cards(root: &Path) -> io::Result<Vec<CardInfo>> {
    let mut cards = Vec::new();
    for adapter in fs::read_dir(root)? {
        let adapter = adapter?;
        let card = match adapter.file_name().to_str().and_then(|n| numbered(n, "adapter")) {
            Some(card) => card,
            None => continue,
        };
        for frontend in fs::read_dir(adapter.path())? {
            let frontend = frontend?;
            let tuner = match frontend.file_name().to_str().and_then(|n| numbered(n, "frontend")) {
                Some(tuner) => tuner,
                None => continue,
            };
            let path = frontend.path();
            cards.push(CardInfo {
                card,
                tuner,
                info: frontend_info(&path).ok(),
                path,
            });
        }
    }
    cards.sort_by_key(|c| (c.card, c.tuner));
    Ok(cards)
}

/// Print the result of [`list_cards`] for a terminal.
pub fn print_cards(cards: &[CardInfo]) {
    if cards.is_empty() {
        println!("{}", "No DVB front-end found".yellow());
        return;
    }
    for card in cards {
        let id = format!("card {} tuner {}", card.card, card.tuner).bold();
        match &card.info {
            Some((name, kind)) => println!("{}: {} [{}]", id, name.green(), kind.cyan()),
            None => println!("{}: {}", id, "cannot query device".red()),
        }
    }
}
