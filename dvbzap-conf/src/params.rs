//! Parameter sets of every subsystem, and the store that aggregates them.
//!
//! Defaults mirror what the engine expects when a directive is absent. Options
//! that the resolver may default later are [`Tristate`]s.

use std::str::FromStr;

use crate::channel::ChannelTable;
use crate::error::ParseValueError;
use crate::tristate::Tristate;

/// Default device path template; `%card` is expanded by the resolver.
pub const DEFAULT_CARD_DEV_PATH: &str = "/dev/dvb/adapter%card";
/// Default PID file template.
pub const DEFAULT_PID_FILE: &str = "/var/run/dvbzap/dvbzap_adapter%card_tuner%tuner.pid";
/// Maximum length of a path given in the configuration.
pub const DEFAULT_PATH_LEN: usize = 255;
/// Default tuning timeout in seconds.
pub const DEFAULT_TUNING_TIMEOUT: u32 = 300;
/// Default number of packets read from the DVR device at once.
pub const DEFAULT_TS_BUFFER_SIZE: u32 = 1;
/// Default size of the reader thread buffer, in packets.
pub const DEFAULT_THREAD_BUFFER_SIZE: u32 = 5000;
/// Seconds without any streamed channel before the engine gives up.
pub const ALARM_TIME_TIMEOUT_NO_DIFF: u32 = 600;
/// Default multicast time-to-live.
pub const DEFAULT_TTL: u32 = 2;

/// LNB polarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarization {
    Horizontal,
    Vertical,
    Left,
    Right,
}

impl Polarization {
    /// Horizontal and circular left use the 18V supply, the others 13V.
    pub fn is_high_voltage(self) -> bool {
        matches!(self, Polarization::Horizontal | Polarization::Left)
    }
}

impl FromStr for Polarization {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('h') => Ok(Polarization::Horizontal),
            Some('v') => Ok(Polarization::Vertical),
            Some('l') => Ok(Polarization::Left),
            Some('r') => Ok(Polarization::Right),
            _ => Err(ParseValueError(s.to_string())),
        }
    }
}

/// Delivery system requested for tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverySystem {
    DvbS,
    DvbS2,
    DvbT,
    DvbT2,
    DvbC,
    Atsc,
    IsdbT,
}

impl DeliverySystem {
    pub fn is_satellite(self) -> bool {
        matches!(self, DeliverySystem::DvbS | DeliverySystem::DvbS2)
    }
}

impl FromStr for DeliverySystem {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DVBS" | "DVB-S" => Ok(DeliverySystem::DvbS),
            "DVBS2" | "DVB-S2" => Ok(DeliverySystem::DvbS2),
            "DVBT" | "DVB-T" => Ok(DeliverySystem::DvbT),
            "DVBT2" | "DVB-T2" => Ok(DeliverySystem::DvbT2),
            "DVBC" | "DVB-C" | "DVBC_ANNEX_AC" => Ok(DeliverySystem::DvbC),
            "ATSC" => Ok(DeliverySystem::Atsc),
            "ISDBT" | "ISDB-T" => Ok(DeliverySystem::IsdbT),
            _ => Err(ParseValueError(s.to_string())),
        }
    }
}

/// LNB kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LnbType {
    /// Two local oscillators switched with the 22kHz tone.
    #[default]
    Universal,
    /// Single local oscillator.
    Standard,
}

impl FromStr for LnbType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "universal" => Ok(LnbType::Universal),
            "standard" => Ok(LnbType::Standard),
            _ => Err(ParseValueError(s.to_string())),
        }
    }
}

/// LNB frequencies, in MHz.
#[derive(Debug, Clone, PartialEq)]
pub struct LnbParameters {
    pub lnb_type: LnbType,
    pub lof_standard: u32,
    /// Switch frequency between low and high band.
    pub slof: u32,
    pub lof_low: u32,
    pub lof_high: u32,
    pub voltage_off: bool,
}

impl Default for LnbParameters {
    fn default() -> Self {
        Self {
            lnb_type: LnbType::Universal,
            lof_standard: 10750,
            slof: 11700,
            lof_low: 9750,
            lof_high: 10600,
            voltage_off: false,
        }
    }
}

/// Front-end tuning parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningParameters {
    /// Adapter number; `None` until given or defaulted by the resolver.
    pub card: Option<u32>,
    pub tuner: u32,
    /// Frequency in MHz.
    pub freq: f64,
    pub pol: Option<Polarization>,
    /// Symbol rate in kSymbols/s.
    pub srate: u32,
    pub modulation: Option<String>,
    /// Channel bandwidth in MHz (terrestrial).
    pub bandwidth: u32,
    pub delivery_system: Option<DeliverySystem>,
    pub card_dev_path: String,
    /// Seconds allowed for tuning; `0` disables the watchdog.
    pub tuning_timeout: u32,
    pub lnb: LnbParameters,
    /// DiSEqC satellite position, `0` for none.
    pub sat_number: u8,
    /// Replay a recorded transport stream instead of opening a front-end.
    pub read_file_path: Option<String>,
}

impl Default for TuningParameters {
    fn default() -> Self {
        Self {
            card: None,
            tuner: 0,
            freq: 0.0,
            pol: None,
            srate: 0,
            modulation: None,
            bandwidth: 8,
            delivery_system: None,
            card_dev_path: DEFAULT_CARD_DEV_PATH.to_string(),
            tuning_timeout: DEFAULT_TUNING_TIMEOUT,
            lnb: LnbParameters::default(),
            sat_number: 0,
            read_file_path: None,
        }
    }
}

/// Autoconfiguration mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoconfMode {
    #[default]
    None,
    Full,
}

impl FromStr for AutoconfMode {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" | "1" | "2" => Ok(AutoconfMode::Full),
            "none" | "0" => Ok(AutoconfMode::None),
            _ => Err(ParseValueError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoconfParameters {
    pub mode: AutoconfMode,
    pub radios: bool,
    pub scrambled: bool,
    /// Follow PMT updates after the initial discovery.
    pub pid_update: bool,
    pub ip4_template: String,
    pub name_template: Option<String>,
    /// Restrict discovery to these service ids; empty means all.
    pub sid_list: Vec<u16>,
}

impl AutoconfParameters {
    pub fn is_enabled(&self) -> bool {
        self.mode != AutoconfMode::None
    }
}

impl Default for AutoconfParameters {
    fn default() -> Self {
        Self {
            mode: AutoconfMode::None,
            radios: false,
            scrambled: false,
            pid_update: true,
            ip4_template: "239.100.%card.%number".to_string(),
            name_template: None,
            sid_list: Vec::new(),
        }
    }
}

/// SAP announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SapParameters {
    pub sap: Tristate,
    pub organisation: String,
    pub uri: Option<String>,
    pub sending_ip: String,
    /// Seconds between two announces.
    pub interval: u32,
    pub default_group: Option<String>,
    pub ttl: u32,
}

impl Default for SapParameters {
    fn default() -> Self {
        Self {
            sap: Tristate::Undefined,
            organisation: "dvbzap".to_string(),
            uri: None,
            sending_ip: "0.0.0.0".to_string(),
            interval: 5,
            default_group: None,
            ttl: 255,
        }
    }
}

/// Hardware conditional access module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CamParameters {
    pub cam_support: bool,
    pub cam_number: u32,
    /// Seconds between reset attempts of a non responding CAM.
    pub reset_interval: u32,
    /// Seconds to wait before sending the CA PMT.
    pub delay_pmt_send: u32,
}

impl Default for CamParameters {
    fn default() -> Self {
        Self {
            cam_support: false,
            cam_number: 0,
            reset_interval: 30,
            delay_pmt_send: 0,
        }
    }
}

/// Software descrambling defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScamParameters {
    pub scam_support: bool,
    /// Packets in a channel ring buffer; a power of two.
    pub ring_buffer_default_size: u32,
    /// Microseconds before a packet is descrambled.
    pub decsa_default_delay: u32,
    /// Microseconds before a packet is sent.
    pub send_default_delay: u32,
}

impl Default for ScamParameters {
    fn default() -> Self {
        Self {
            scam_support: false,
            ring_buffer_default_size: 32768,
            decsa_default_delay: 500_000,
            send_default_delay: 1_500_000,
        }
    }
}

/// HTTP unicast output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnicastParameters {
    pub unicast: bool,
    pub ip_http: String,
    /// Master port expression, may contain `%card`, `%tuner`, `%server`.
    pub port_out_str: Option<String>,
    /// Master port computed from [`port_out_str`](Self::port_out_str).
    pub port_out: Option<u16>,
    /// `0` means no limit.
    pub max_clients: u32,
    pub consecutive_errors_timeout: u32,
    pub queue_size: u32,
}

impl Default for UnicastParameters {
    fn default() -> Self {
        Self {
            unicast: false,
            ip_http: "0.0.0.0".to_string(),
            port_out_str: None,
            port_out: None,
            max_clients: 0,
            consecutive_errors_timeout: 5,
            queue_size: 512,
        }
    }
}

/// Multicast output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastParameters {
    /// True when any of IPv4 or IPv6 multicast is enabled.
    pub multicast: bool,
    pub multicast_ipv4: bool,
    pub multicast_ipv6: bool,
    pub ttl: u32,
    pub auto_join: bool,
    pub rtp_header: bool,
    pub iface4: Option<String>,
    pub iface6: Option<String>,
    pub common_port: u16,
}

impl MulticastParameters {
    pub(crate) fn refresh(&mut self) {
        self.multicast = self.multicast_ipv4 || self.multicast_ipv6;
    }
}

impl Default for MulticastParameters {
    fn default() -> Self {
        Self {
            multicast: true,
            multicast_ipv4: true,
            multicast_ipv6: false,
            ttl: DEFAULT_TTL,
            auto_join: false,
            rtp_header: false,
            iface4: None,
            iface6: None,
            common_port: 1234,
        }
    }
}

/// PSI table rewriting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteParameters {
    pub rewrite_pat: Tristate,
    pub rewrite_sdt: Tristate,
    pub rewrite_eit: bool,
    pub sdt_force_eit: bool,
}

/// DVR read buffering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferParameters {
    /// Packets read from the DVR device at once, at least 1.
    pub dvr_buffer_size: u32,
    /// Read the card from a dedicated thread.
    pub threaded_read: bool,
    /// Reader thread buffer in packets, never below `dvr_buffer_size`.
    pub max_thread_buffer_size: u32,
    pub show_buffer_stats: bool,
}

impl Default for BufferParameters {
    fn default() -> Self {
        Self {
            dvr_buffer_size: DEFAULT_TS_BUFFER_SIZE,
            threaded_read: false,
            max_thread_buffer_size: DEFAULT_THREAD_BUFFER_SIZE,
            show_buffer_stats: false,
        }
    }
}

/// Log destination requested in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogType {
    #[default]
    Undefined,
    Console,
    Syslog,
}

impl FromStr for LogType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(LogType::Console),
            "syslog" => Ok(LogType::Syslog),
            _ => Err(ParseValueError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingParameters {
    pub log_type: LogType,
    pub log_header: bool,
    /// Seconds between two flushes of the log file.
    pub flush_interval: f64,
    /// Log file template, may contain `%card`, `%tuner`, `%server`.
    pub log_file: Option<String>,
    pub show_traffic_interval: u32,
    pub compute_traffic_interval: u32,
}

impl Default for LoggingParameters {
    fn default() -> Self {
        Self {
            log_type: LogType::Undefined,
            log_header: true,
            flush_interval: -1.0,
            log_file: None,
            show_traffic_interval: 10,
            compute_traffic_interval: 10,
        }
    }
}

/// Which PSI tables are forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PsiTablesFiltering {
    #[default]
    None,
    PatOnly,
    PatCatOnly,
}

impl FromStr for PsiTablesFiltering {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(PsiTablesFiltering::None),
            "pat" => Ok(PsiTablesFiltering::PatOnly),
            "pat_cat" => Ok(PsiTablesFiltering::PatCatOnly),
            _ => Err(ParseValueError(s.to_string())),
        }
    }
}

/// Options owned by the orchestrator itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub timeout_no_diff: u32,
    pub tuning_no_diff: u32,
    pub dont_send_scrambled: bool,
    pub filter_transport_error: bool,
    pub psi_tables_filtering: PsiTablesFiltering,
    /// Value of the `%server` template.
    pub server_id: i64,
    /// PID file template.
    pub filename_pid: String,
    pub check_cc: bool,
    /// T2-MI demultiplexing PID, `0` when disabled.
    pub t2mi_pid: u16,
    pub t2mi_plp: u8,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            timeout_no_diff: ALARM_TIME_TIMEOUT_NO_DIFF,
            tuning_no_diff: 0,
            dont_send_scrambled: false,
            filter_transport_error: false,
            psi_tables_filtering: PsiTablesFiltering::None,
            server_id: 0,
            filename_pid: DEFAULT_PID_FILE.to_string(),
            check_cc: false,
            t2mi_pid: 0,
            t2mi_plp: 0,
        }
    }
}

/// Every parameter of the process, owned by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    pub tuning: TuningParameters,
    pub autoconf: AutoconfParameters,
    pub sap: SapParameters,
    pub cam: CamParameters,
    pub scam: ScamParameters,
    pub unicast: UnicastParameters,
    pub multicast: MulticastParameters,
    pub rewrite: RewriteParameters,
    pub buffering: BufferParameters,
    pub logging: LoggingParameters,
    pub engine: EngineOptions,
    pub channels: ChannelTable,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarization_parse() {
        assert_eq!("h".parse::<Polarization>().unwrap(), Polarization::Horizontal);
        assert_eq!("V".parse::<Polarization>().unwrap(), Polarization::Vertical);
        assert_eq!("left".parse::<Polarization>().unwrap(), Polarization::Left);
        assert!("x".parse::<Polarization>().is_err());
        assert!(Polarization::Horizontal.is_high_voltage());
        assert!(!Polarization::Right.is_high_voltage());
    }

    #[test]
    fn test_delivery_system_parse() {
        assert_eq!("dvbs2".parse::<DeliverySystem>().unwrap(), DeliverySystem::DvbS2);
        assert_eq!("DVB-T".parse::<DeliverySystem>().unwrap(), DeliverySystem::DvbT);
        assert!("dab".parse::<DeliverySystem>().is_err());
    }

    #[test]
    fn test_defaults() {
        let store = ParameterStore::new();
        assert!(store.multicast.multicast);
        assert_eq!(store.multicast.ttl, DEFAULT_TTL);
        assert!(!store.unicast.unicast);
        assert!(store.sap.sap.is_undefined());
        assert_eq!(store.tuning.card, None);
        assert_eq!(store.buffering.dvr_buffer_size, 1);
        assert!(store.channels.is_empty());
    }
}
