use std::path::PathBuf;

use clap::Parser;

use dvbzap_conf::params::{DeliverySystem, Polarization};
use dvbzap_conf::ParameterStore;

/// Directory of the generated channel lists.
pub const DEFAULT_RUN_DIR: &str = "/var/run/dvbzap";

#[derive(Debug, Parser)]
#[clap(name = "dvbzap")]
#[clap(about = "dvbzap tunes a DVB front-end from a configuration file and keeps it tuned until it is told to stop.", long_about = None)]
#[clap(version)]
pub struct Cli {
    /// The configuration file.{n}
    /// Without it, tuning is driven by the command line only.
    #[clap(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// List the DVB front-ends of this machine and exit.
    #[clap(short, long)]
    pub list_cards: bool,

    /// The adapter number (`/dev/dvb/adapterN`).
    #[clap(short = 'a', long)]
    pub card: Option<u32>,

    /// The front-end number inside the adapter.
    #[clap(short = 'n', long)]
    pub tuner: Option<u32>,

    /// Value substituted for `%server` in templated paths.
    #[clap(long)]
    pub server_id: Option<i64>,

    /// Transponder frequency, in MHz.
    #[clap(short, long)]
    pub freq: Option<f64>,

    /// Polarization (h, v, l or r).
    #[clap(short, long)]
    pub pol: Option<Polarization>,

    /// Symbol rate, in kSymbols/s.
    #[clap(short, long)]
    pub srate: Option<u32>,

    /// Delivery system (DVBS, DVBS2, DVBT, DVBT2, DVBC, ATSC, ISDBT).
    #[clap(long)]
    pub delivery_system: Option<DeliverySystem>,

    /// Replay a recorded transport stream instead of opening a front-end.
    #[clap(long, value_name = "FILE")]
    pub read_file: Option<PathBuf>,

    /// Seconds allowed for tuning before the process gives up. 0 disables the watchdog.
    #[clap(long, value_name = "SECONDS")]
    pub tuning_timeout: Option<u32>,

    /// Detach from the terminal and write a PID file.
    #[clap(short, long)]
    pub daemon: bool,

    /// Where the channel lists are written.
    #[clap(long, value_name = "DIR", default_value = DEFAULT_RUN_DIR)]
    pub run_dir: PathBuf,

    /// Stop right after the front-end is tuned.
    #[clap(short = 'x', long)]
    pub exit_after_tune: bool,

    /// Log the front-end status every second.
    #[clap(long)]
    pub show_signal: bool,

    /// More output. Repeat for more.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Less output. Repeat for less.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    /// Net verbosity: positive is chattier than `info`.
    pub fn verbosity(&self) -> i8 {
        let verbose = i8::try_from(self.verbose).unwrap_or(i8::MAX);
        let quiet = i8::try_from(self.quiet).unwrap_or(i8::MAX);
        verbose.saturating_sub(quiet)
    }

    /// Apply command line tuning options on top of the configuration file.
    pub fn apply_overrides(&self, store: &mut ParameterStore) {
        let tune = &mut store.tuning;
        if let Some(card) = self.card {
            tune.card = Some(card);
        }
        if let Some(tuner) = self.tuner {
            tune.tuner = tuner;
        }
        if let Some(freq) = self.freq {
            tune.freq = freq;
        }
        if let Some(pol) = self.pol {
            tune.pol = Some(pol);
        }
        if let Some(srate) = self.srate {
            tune.srate = srate;
        }
        if let Some(system) = self.delivery_system {
            tune.delivery_system = Some(system);
        }
        if let Some(path) = &self.read_file {
            tune.read_file_path = Some(path.to_string_lossy().into_owned());
        }
        if let Some(timeout) = self.tuning_timeout {
            tune.tuning_timeout = timeout;
        }
        if let Some(server_id) = self.server_id {
            store.engine.server_id = server_id;
        }
    }
}
