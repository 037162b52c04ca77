use std::path::Path;

use clap::Parser;
use log::error;

use dvbzap::context::Cli;
use dvbzap::engine::HoldEngine;
use dvbzap::logging::init_logging;
use dvbzap::orchestrator::Orchestrator;
use dvbzap::signals::{AlarmWatchdog, ProcessSignalState, SignalSupervisor};
use dvbzap::tuner::{list_cards, print_cards, DvbFrontend};
use dvbzap_conf::ExitCode;

const DVB_ROOT: &str = "/dev/dvb";

static SIGNALS: ProcessSignalState = ProcessSignalState::new();

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let status = if e.use_stderr() { ExitCode::Args.code() } else { 0 };
            std::process::exit(status);
        }
    };

    if cli.list_cards {
        match list_cards(Path::new(DVB_ROOT)) {
            Ok(cards) => print_cards(&cards),
            Err(e) => eprintln!("Cannot read {}: {}", DVB_ROOT, e),
        }
        std::process::exit(0);
    }

    if cli.daemon {
        if let Err(e) = nix::unistd::daemon(true, false) {
            eprintln!("Cannot daemonize: {}", e);
            std::process::exit(ExitCode::Generic.code());
        }
    }

    let log_sink = match init_logging(cli.verbosity()) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(ExitCode::Generic.code());
        }
    };

    if let Err(e) = SignalSupervisor::install(&SIGNALS) {
        error!("{}", e);
        std::process::exit(e.exit_code().code());
    }

    let engine = HoldEngine::new(cli.exit_after_tune, cli.show_signal);
    let orchestrator = Orchestrator::new(
        cli,
        DvbFrontend::new(),
        AlarmWatchdog,
        engine,
        &SIGNALS,
        log_sink,
    );
    std::process::exit(orchestrator.start());
}
