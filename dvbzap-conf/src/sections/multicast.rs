//! Multicast output directives.

use super::{port_value, ParseContext, Recognized, SectionParser};
use crate::error::ConfigError;
use crate::tokens::Tokens;

pub struct MulticastSection;

impl SectionParser for MulticastSection {
    fn section(&self) -> &'static str {
        "Multicast"
    }

    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError> {
        match keyword {
            "ip" | "ip4" => {
                let channel = ctx.channel_mut(keyword)?;
                channel.ip4 = Some(args.value(keyword)?.to_string());
                return Ok(Recognized::Handled);
            }
            "ip6" => {
                let channel = ctx.channel_mut(keyword)?;
                channel.ip6 = Some(args.value(keyword)?.to_string());
                return Ok(Recognized::Handled);
            }
            "port" => {
                let channel = ctx.channel_mut(keyword)?;
                channel.port = Some(port_value(keyword, args)?);
                return Ok(Recognized::Handled);
            }
            _ => {}
        }

        let multicast = &mut ctx.store.multicast;
        match keyword {
            "multicast" | "multicast_ipv4" => {
                multicast.multicast_ipv4 = args.flag(keyword)?;
                multicast.refresh();
            }
            "multicast_ipv6" => {
                multicast.multicast_ipv6 = args.flag(keyword)?;
                multicast.refresh();
            }
            "multicast_ttl" => multicast.ttl = args.uint(keyword)?,
            "multicast_auto_join" => multicast.auto_join = args.flag(keyword)?,
            "rtp_header" => multicast.rtp_header = args.flag(keyword)?,
            "multicast_iface4" => multicast.iface4 = Some(args.value(keyword)?.to_string()),
            "multicast_iface6" => multicast.iface6 = Some(args.value(keyword)?.to_string()),
            "common_port" => multicast.common_port = port_value(keyword, args)?,
            _ => return Ok(Recognized::NotMine),
        }
        Ok(Recognized::Handled)
    }
}
