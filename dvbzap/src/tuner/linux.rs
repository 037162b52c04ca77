//! Linux DVB front-ends through the legacy frontend ioctls.

use std::ffi::CStr;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use std::io;

use log::{debug, info};
use nix::fcntl::{open, OFlag};
use nix::libc::c_char;
use nix::sys::stat::Mode;
use nix::{ioctl_read, ioctl_write_int_bad, ioctl_write_ptr, request_code_none};

use dvbzap_conf::params::{DeliverySystem, LnbType, TuningParameters};

use super::{frontend_path, Frontend, FrontendDevice, FrontendStatus, TuneError};
use crate::signals::ProcessSignalState;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DISEQC_SETTLE: Duration = Duration::from_millis(15);

// enum fe_type
const FE_QPSK: u32 = 0;
const FE_QAM: u32 = 1;
const FE_OFDM: u32 = 2;
const FE_ATSC: u32 = 3;

const INVERSION_AUTO: u32 = 2;
const FEC_AUTO: u32 = 9;
const QAM_AUTO: u32 = 6;
const VSB_8: u32 = 7;
const BANDWIDTH_AUTO: u32 = 3;
const TRANSMISSION_MODE_AUTO: u32 = 2;
const GUARD_INTERVAL_AUTO: u32 = 4;
const HIERARCHY_AUTO: u32 = 4;

const SEC_VOLTAGE_13: i32 = 0;
const SEC_VOLTAGE_18: i32 = 1;
const SEC_VOLTAGE_OFF: i32 = 2;
const SEC_TONE_ON: i32 = 0;
const SEC_TONE_OFF: i32 = 1;

/// `struct dvb_frontend_info`
#[allow(dead_code)]
#[repr(C)]
pub struct DvbFrontendInfo {
    name: [c_char; 128],
    fe_type: u32,
    frequency_min: u32,
    frequency_max: u32,
    frequency_stepsize: u32,
    frequency_tolerance: u32,
    symbol_rate_min: u32,
    symbol_rate_max: u32,
    symbol_rate_tolerance: u32,
    notifier_delay: u32,
    caps: u32,
}

/// `struct dvb_frontend_parameters`; `u` overlays the qpsk/qam/ofdm/vsb union.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DvbFrontendParameters {
    frequency: u32,
    inversion: u32,
    u: [u32; 7],
}

/// `struct dvb_diseqc_master_cmd`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DvbDiseqcMasterCmd {
    msg: [u8; 6],
    msg_len: u8,
}

ioctl_read!(fe_get_info, b'o', 61, DvbFrontendInfo);
ioctl_write_ptr!(fe_diseqc_send_master_cmd, b'o', 63, DvbDiseqcMasterCmd);
ioctl_write_int_bad!(fe_set_tone, request_code_none!(b'o', 66));
ioctl_write_int_bad!(fe_set_voltage, request_code_none!(b'o', 67));
ioctl_read!(fe_read_status, b'o', 69, u32);
ioctl_read!(fe_read_signal_strength, b'o', 71, u16);
ioctl_read!(fe_read_snr, b'o', 72, u16);
ioctl_write_ptr!(fe_set_frontend, b'o', 76, DvbFrontendParameters);

fn fe_type_name(fe_type: u32) -> &'static str {
    match fe_type {
        FE_QPSK => "DVB-S",
        FE_QAM => "DVB-C",
        FE_OFDM => "DVB-T",
        FE_ATSC => "ATSC",
        _ => "unknown",
    }
}

fn read_info(fd: &OwnedFd) -> io::Result<(String, u32)> {
    let mut info = std::mem::MaybeUninit::<DvbFrontendInfo>::zeroed();
    // SAFETY: the kernel fills a `dvb_frontend_info` of the same layout.
    let info = unsafe {
        fe_get_info(fd.as_raw_fd(), info.as_mut_ptr()).map_err(io::Error::from)?;
        info.assume_init()
    };
    // SAFETY: the driver NUL-terminates the name; the last byte is forced to NUL.
    let mut raw = info.name;
    raw[raw.len() - 1] = 0;
    let name = unsafe { CStr::from_ptr(raw.as_ptr()) };
    Ok((name.to_string_lossy().trim().to_string(), info.fe_type))
}

fn open_fd(path: &Path, flags: OFlag) -> io::Result<OwnedFd> {
    let fd = open(path, flags, Mode::empty()).map_err(io::Error::from)?;
    // SAFETY: `open` returned a fresh descriptor owned by nobody else.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Name and type of the front-end at `path`.
pub fn frontend_info(path: &Path) -> io::Result<(String, &'static str)> {
    let fd = open_fd(path, OFlag::O_RDONLY | OFlag::O_NONBLOCK)?;
    let (name, fe_type) = read_info(&fd)?;
    Ok((name, fe_type_name(fe_type)))
}

/// An opened Linux front-end. The descriptor closes on drop.
#[derive(Debug)]
pub struct DvbDevice {
    fd: OwnedFd,
    path: PathBuf,
    name: String,
    fe_type: u32,
}

impl FrontendDevice for DvbDevice {
    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.path.display())
    }

    fn status(&self) -> io::Result<FrontendStatus> {
        let raw = self.fd.as_raw_fd();
        let mut flags = 0u32;
        // SAFETY: FE_READ_STATUS writes one fe_status_t.
        unsafe { fe_read_status(raw, &mut flags) }.map_err(io::Error::from)?;
        let mut strength = 0u16;
        let mut snr = 0u16;
        // SAFETY: both ioctls write one u16; drivers may not implement them.
        let strength = unsafe { fe_read_signal_strength(raw, &mut strength) }
            .ok()
            .map(|_| strength);
        let snr = unsafe { fe_read_snr(raw, &mut snr) }.ok().map(|_| snr);
        Ok(FrontendStatus {
            flags,
            strength,
            snr,
        })
    }
}

/// Satellite intermediate frequency in kHz, and whether the high band tone is needed.
fn satellite_if(params: &TuningParameters) -> (u32, bool) {
    let freq_khz = (params.freq * 1000.0).round() as i64;
    let lnb = &params.lnb;
    let (lof_mhz, high_band) = match lnb.lnb_type {
        LnbType::Universal if params.freq >= f64::from(lnb.slof) => (lnb.lof_high, true),
        LnbType::Universal => (lnb.lof_low, false),
        LnbType::Standard => (lnb.lof_standard, false),
    };
    let if_khz = (freq_khz - i64::from(lof_mhz) * 1000).unsigned_abs();
    (u32::try_from(if_khz).unwrap_or(u32::MAX), high_band)
}

fn hertz(freq_mhz: f64) -> u32 {
    (freq_mhz * 1_000_000.0).round() as u32
}

fn bandwidth_code(mhz: u32) -> u32 {
    match mhz {
        8 => 0,
        7 => 1,
        6 => 2,
        _ => BANDWIDTH_AUTO,
    }
}

fn qam_code(modulation: Option<&str>) -> u32 {
    match modulation.map(str::to_ascii_uppercase).as_deref() {
        Some("QPSK") => 0,
        Some("QAM16") | Some("QAM_16") => 1,
        Some("QAM32") | Some("QAM_32") => 2,
        Some("QAM64") | Some("QAM_64") => 3,
        Some("QAM128") | Some("QAM_128") => 4,
        Some("QAM256") | Some("QAM_256") => 5,
        _ => QAM_AUTO,
    }
}

/// Legacy frontend parameters for `params` on a front-end of type `fe_type`.
fn legacy_parameters(
    params: &TuningParameters,
    fe_type: u32,
) -> Result<DvbFrontendParameters, TuneError> {
    let kind = match params.delivery_system {
        Some(DeliverySystem::DvbS | DeliverySystem::DvbS2) => FE_QPSK,
        Some(DeliverySystem::DvbC) => FE_QAM,
        Some(DeliverySystem::DvbT | DeliverySystem::DvbT2 | DeliverySystem::IsdbT) => FE_OFDM,
        Some(DeliverySystem::Atsc) => FE_ATSC,
        None => fe_type,
    };
    let mut fe = DvbFrontendParameters {
        inversion: INVERSION_AUTO,
        ..DvbFrontendParameters::default()
    };
    match kind {
        FE_QPSK => {
            fe.frequency = satellite_if(params).0;
            fe.u[0] = params.srate * 1000;
            fe.u[1] = FEC_AUTO;
        }
        FE_QAM => {
            fe.frequency = hertz(params.freq);
            fe.u[0] = params.srate * 1000;
            fe.u[1] = FEC_AUTO;
            fe.u[2] = qam_code(params.modulation.as_deref());
        }
        FE_OFDM => {
            fe.frequency = hertz(params.freq);
            fe.u = [
                bandwidth_code(params.bandwidth),
                FEC_AUTO,
                FEC_AUTO,
                QAM_AUTO,
                TRANSMISSION_MODE_AUTO,
                GUARD_INTERVAL_AUTO,
                HIERARCHY_AUTO,
            ];
        }
        FE_ATSC => {
            fe.frequency = hertz(params.freq);
            fe.u[0] = match params.modulation.as_deref() {
                Some(m) if m.to_ascii_uppercase().contains("QAM") => qam_code(Some(m)),
                _ => VSB_8,
            };
        }
        other => {
            return Err(TuneError::Parameters(format!(
                "unsupported front-end type {}",
                other
            )))
        }
    }
    if fe.frequency == 0 {
        return Err(TuneError::Parameters("no frequency given".to_string()));
    }
    Ok(fe)
}

/// Committed switch command selecting satellite `sat_number` (1 based).
fn diseqc_command(sat_number: u8, horizontal: bool, high_band: bool) -> DvbDiseqcMasterCmd {
    let position = (sat_number.saturating_sub(1) & 0x03) << 2;
    let data = 0xf0 | position | (u8::from(horizontal) << 1) | u8::from(high_band);
    DvbDiseqcMasterCmd {
        msg: [0xe0, 0x10, 0x38, data, 0, 0],
        msg_len: 4,
    }
}

fn setup_lnb(device: &DvbDevice, params: &TuningParameters) -> Result<(), TuneError> {
    let pol = params
        .pol
        .ok_or_else(|| TuneError::Parameters("no polarization given".to_string()))?;
    let (_, high_band) = satellite_if(params);
    let raw = device.fd.as_raw_fd();
    let voltage = if params.lnb.voltage_off {
        SEC_VOLTAGE_OFF
    } else if pol.is_high_voltage() {
        SEC_VOLTAGE_18
    } else {
        SEC_VOLTAGE_13
    };

    // SAFETY: FE_SET_TONE and FE_SET_VOLTAGE take their argument by value.
    unsafe { fe_set_tone(raw, SEC_TONE_OFF) }.map_err(io::Error::from)?;
    unsafe { fe_set_voltage(raw, voltage) }.map_err(io::Error::from)?;
    thread::sleep(DISEQC_SETTLE);

    if params.sat_number > 0 {
        let cmd = diseqc_command(params.sat_number, pol.is_high_voltage(), high_band);
        debug!("DiSEqC command {:02x?}", &cmd.msg[..usize::from(cmd.msg_len)]);
        // SAFETY: FE_DISEQC_SEND_MASTER_CMD reads one dvb_diseqc_master_cmd.
        unsafe { fe_diseqc_send_master_cmd(raw, &cmd) }.map_err(io::Error::from)?;
        thread::sleep(DISEQC_SETTLE);
    }

    let tone = if high_band { SEC_TONE_ON } else { SEC_TONE_OFF };
    // SAFETY: see above.
    unsafe { fe_set_tone(raw, tone) }.map_err(io::Error::from)?;
    Ok(())
}

/// Linux [`Frontend`] implementation.
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
        let path = frontend_path(dev_path, tuner);
        let open_error = |source| TuneError::Open {
            path: path.clone(),
            source,
        };
        let fd = open_fd(&path, OFlag::O_RDWR | OFlag::O_NONBLOCK).map_err(open_error)?;
        let (name, fe_type) = read_info(&fd).map_err(open_error)?;
        info!("Front-end {} is a {} card: {}", path.display(), fe_type_name(fe_type), name);
        Ok(DvbDevice {
            fd,
            path,
            name,
            fe_type,
        })
    }

    fn tune(
        &mut self,
        device: &mut DvbDevice,
        params: &TuningParameters,
        signals: &ProcessSignalState,
    ) -> Result<(), TuneError> {
        let fe = legacy_parameters(params, device.fe_type)?;
        let satellite = params
            .delivery_system
            .map_or(device.fe_type == FE_QPSK, DeliverySystem::is_satellite);
        if satellite {
            setup_lnb(device, params)?;
        }

        debug!("Tuning {} with {:?}", device.describe(), fe);
        // SAFETY: FE_SET_FRONTEND reads one dvb_frontend_parameters.
        unsafe { fe_set_frontend(device.fd.as_raw_fd(), &fe) }.map_err(io::Error::from)?;

        loop {
            if signals.is_interrupted() {
                return Err(TuneError::Interrupted);
            }
            let status = device.status()?;
            if status.has_lock() {
                info!("Front-end locked: {}", status);
                return Ok(());
            }
            thread::sleep(LOCK_POLL_INTERVAL);
        }
    }
}
