//! Directive recognizers, one per subsystem.
//!
//! The dispatcher hands the first token of a line to each [`SectionParser`] in
//! priority order. A parser that does not own the keyword answers
//! [`Recognized::NotMine`] without consuming any token; the first parser that
//! answers [`Recognized::Handled`] or fails ends the search.

use std::str::FromStr;

use log::warn;

use crate::channel::ChannelEntry;
use crate::error::ConfigError;
use crate::params::{ParameterStore, DEFAULT_PATH_LEN};
use crate::tokens::Tokens;

pub mod autoconf;
pub mod cam;
pub mod local;
pub mod logging;
pub mod multicast;
pub mod rewrite;
pub mod sap;
pub mod scam;
pub mod tuning;
pub mod unicast;

pub use autoconf::AutoconfSection;
pub use cam::CamSection;
pub use local::LocalSection;
pub use logging::LoggingSection;
pub use multicast::MulticastSection;
pub use rewrite::RewriteSection;
pub use sap::SapSection;
pub use scam::ScamSection;
pub use tuning::TuningSection;
pub use unicast::UnicastSection;

/// Answer of a recognizer that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognized {
    NotMine,
    Handled,
}

/// State visible to a recognizer while a line is parsed.
pub struct ParseContext<'a> {
    pub store: &'a mut ParameterStore,
    /// Index of the channel opened by the last `new_channel`.
    pub current: Option<usize>,
}

impl<'a> ParseContext<'a> {
    pub fn new(store: &'a mut ParameterStore, current: Option<usize>) -> Self {
        Self { store, current }
    }

    /// Channel the directive applies to, or the "start a channel first" error.
    pub fn channel_mut(&mut self, keyword: &str) -> Result<&mut ChannelEntry, ConfigError> {
        match self.current.and_then(|idx| self.store.channels.get_mut(idx)) {
            Some(channel) => Ok(channel),
            None => Err(ConfigError::NoChannel {
                keyword: keyword.to_string(),
            }),
        }
    }
}

/// A subsystem's configuration vocabulary.
pub trait SectionParser: Send + Sync {
    /// Tag used in logs.
    fn section(&self) -> &'static str;

    /// Parse `keyword` and its arguments if this subsystem owns it.
    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError>;
}

/// Recognizers in dispatch priority order.
pub fn default_chain() -> Vec<Box<dyn SectionParser>> {
    vec![
        Box::new(TuningSection),
        Box::new(AutoconfSection),
        Box::new(SapSection),
        Box::new(CamSection),
        Box::new(ScamSection),
        Box::new(UnicastSection),
        Box::new(MulticastSection),
        Box::new(RewriteSection),
        Box::new(LoggingSection),
        Box::new(LocalSection),
    ]
}

/// Next token parsed through [`FromStr`].
pub(crate) fn parse_value<T: FromStr>(
    keyword: &str,
    args: &mut Tokens<'_>,
) -> Result<T, ConfigError> {
    let raw = args.value(keyword)?;
    raw.parse().map_err(|_| ConfigError::invalid(keyword, raw))
}

/// Next token as a port number.
pub(crate) fn port_value(keyword: &str, args: &mut Tokens<'_>) -> Result<u16, ConfigError> {
    let raw = args.value(keyword)?;
    u16::try_from(crate::tokens::atoi(raw)).map_err(|_| ConfigError::invalid(keyword, raw))
}

/// Next token as a path; paths that are too long are ignored with a warning.
pub(crate) fn path_value(
    keyword: &str,
    args: &mut Tokens<'_>,
) -> Result<Option<String>, ConfigError> {
    let raw = args.value(keyword)?;
    if raw.len() >= DEFAULT_PATH_LEN {
        warn!("{} too long, ignored", keyword);
        return Ok(None);
    }
    Ok(Some(raw.to_string()))
}

/// Longest prefix of `s` that fits in `max_bytes` without splitting a character.
pub(crate) fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        let names: Vec<_> = default_chain().iter().map(|p| p.section()).collect();
        assert_eq!(
            names,
            vec![
                "Tune", "Autoconf", "SAP", "CAM", "SCAM", "Unicast", "Multicast", "Rewrite",
                "Logging", "Main"
            ]
        );
    }

    #[test]
    fn test_channel_mut_requires_channel() {
        let mut store = ParameterStore::new();
        let mut ctx = ParseContext::new(&mut store, None);
        assert!(matches!(
            ctx.channel_mut("ip"),
            Err(ConfigError::NoChannel { .. })
        ));

        let idx = ctx.store.channels.open_channel().unwrap();
        ctx.current = Some(idx);
        assert!(ctx.channel_mut("ip").is_ok());
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate_utf8("abcdef", 3), "abc");
        assert_eq!(truncate_utf8("ab", 3), "ab");
        // 'é' is two bytes; do not cut it in half.
        assert_eq!(truncate_utf8("aé", 2), "a");
    }
}
