//! Software descrambling directives.

use super::{ParseContext, Recognized, SectionParser};
use crate::error::ConfigError;
use crate::tokens::Tokens;

pub struct ScamSection;

impl SectionParser for ScamSection {
    fn section(&self) -> &'static str {
        "SCAM"
    }

    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError> {
        match keyword {
            "oscam" | "ring_buffer_size" | "decsa_delay" | "send_delay" => {
                let scam = &mut ctx.channel_mut(keyword)?.scam;
                match keyword {
                    "oscam" => scam.oscam = args.flag(keyword)?,
                    "ring_buffer_size" => scam.ring_buffer_size = Some(args.uint(keyword)?),
                    "decsa_delay" => scam.decsa_delay = Some(args.uint(keyword)?),
                    _ => scam.send_delay = Some(args.uint(keyword)?),
                }
            }
            "scam_support" => ctx.store.scam.scam_support = args.flag(keyword)?,
            "ring_buffer_default_size" => {
                ctx.store.scam.ring_buffer_default_size = args.uint(keyword)?
            }
            "decsa_default_delay" => ctx.store.scam.decsa_default_delay = args.uint(keyword)?,
            "send_default_delay" => ctx.store.scam.send_default_delay = args.uint(keyword)?,
            _ => return Ok(Recognized::NotMine),
        }
        Ok(Recognized::Handled)
    }
}
