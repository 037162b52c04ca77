//! Channel table built from `new_channel` blocks.
//!
//! Channels are appended in configuration order and never removed. Once the
//! configuration is parsed the table is frozen and the final channel count is
//! published under a lock, for the engine threads that read it later.

use log::info;
use parking_lot::Mutex;

use crate::error::ConfigError;

/// Maximum number of channels in a configuration.
pub const MAX_CHANNELS: usize = 128;
/// Maximum number of PIDs a single channel can carry.
pub const MAX_PIDS: usize = 128;
/// Maximum channel name length, terminator included.
pub const MAX_NAME_LEN: usize = 256;
/// Lowest PID accepted in `pids` and `pmt_pid`.
pub const PID_MIN: i64 = 10;
/// Highest PID accepted in `pids`.
pub const PID_MAX: i64 = 8192;
/// Highest PID accepted in `pmt_pid`.
pub const PMT_PID_MAX: i64 = 8191;

/// Readiness of a channel for streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    #[default]
    Undefined,
    /// Declared in the configuration, waiting for its PIDs.
    AlmostReady,
    /// PIDs are known.
    Ready,
}

/// Software descrambling settings of a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelScam {
    /// Ask oscam for control words for this channel.
    pub oscam: bool,
    pub ring_buffer_size: Option<u32>,
    pub decsa_delay: Option<u32>,
    pub send_delay: Option<u32>,
}

/// One channel of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelEntry {
    pub service_id: Option<u16>,
    pub pids: Vec<u16>,
    /// PIDs come from the configuration; autoconfiguration must not overwrite them.
    pub pids_user_set: bool,
    pub pmt_pid: Option<u16>,
    pub pmt_rewrite: bool,
    pub name: String,
    /// Name as typed by the user, kept for name templates.
    pub user_name: String,
    pub name_user_set: bool,
    pub readiness: Readiness,
    // Output addressing
    pub ip4: Option<String>,
    pub ip6: Option<String>,
    pub port: Option<u16>,
    pub unicast_port: Option<u16>,
    pub sap_group: Option<String>,
    pub scam: ChannelScam,
}

/// Fixed-capacity, append-only channel table.
#[derive(Debug, Default)]
pub struct ChannelTable {
    entries: Vec<ChannelEntry>,
    published: Mutex<Option<usize>>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new channel and return its index.
    pub fn open_channel(&mut self) -> Result<usize, ConfigError> {
        if self.entries.len() >= MAX_CHANNELS {
            return Err(ConfigError::TooManyChannels {
                count: self.entries.len() + 1,
                limit: MAX_CHANNELS,
            });
        }
        self.entries.push(ChannelEntry {
            readiness: Readiness::AlmostReady,
            ..ChannelEntry::default()
        });
        Ok(self.entries.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&ChannelEntry> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ChannelEntry> {
        self.entries.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelEntry> {
        self.entries.iter()
    }

    /// End of parsing: channels with user PIDs become ready and the channel
    /// count is published.
    pub fn freeze(&mut self) {
        for channel in self.entries.iter_mut() {
            if channel.pids_user_set && !channel.pids.is_empty() {
                channel.readiness = Readiness::Ready;
            }
        }
        *self.published.lock() = Some(self.entries.len());
        info!("Channel table frozen with {} channel(s)", self.entries.len());
    }

    /// Published channel count, `None` until [`freeze`](Self::freeze) runs.
    pub fn number_of_channels(&self) -> Option<usize> {
        *self.published.lock()
    }
}

impl Clone for ChannelTable {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            published: Mutex::new(*self.published.lock()),
        }
    }
}

impl PartialEq for ChannelTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries && self.number_of_channels() == other.number_of_channels()
    }
}
