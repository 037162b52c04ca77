use std::io::{self, ErrorKind};
use std::path::Path;

use dvbzap_conf::params::TuningParameters;

use super::{frontend_path, Frontend, FrontendDevice, FrontendStatus, TuneError};
use crate::signals::ProcessSignalState;

const UNSUPPORTED_MSG: &str = "DVB front-end access is not supported on this platform (supported: Linux)";

fn unsupported() -> io::Error {
    io::Error::new(ErrorKind::Unsupported, UNSUPPORTED_MSG)
}

pub fn frontend_info(_path: &Path) -> io::Result<(String, &'static str)> {
    Err(unsupported())
}

#[derive(Debug)]
pub struct DvbDevice {
    _private: (),
}

impl FrontendDevice for DvbDevice {
    fn describe(&self) -> String {
        String::from("unsupported front-end")
    }

    fn status(&self) -> io::Result<FrontendStatus> {
        Err(unsupported())
    }
}

#[derive(Debug, Default)]
pub struct DvbFrontend;

impl DvbFrontend {
    pub fn new() -> Self {
        Self
    }
}

impl Frontend for DvbFrontend {
    type Device = DvbDevice;

    fn open_device(&mut self, dev_path: &Path, tuner: u32) -> Result<DvbDevice, TuneError> {
        Err(TuneError::Open {
            path: frontend_path(dev_path, tuner),
            source: unsupported(),
        })
    }

    fn tune(
        &mut self,
        _device: &mut DvbDevice,
        _params: &TuningParameters,
        _signals: &ProcessSignalState,
    ) -> Result<(), TuneError> {
        Err(TuneError::Io(unsupported()))
    }
}
