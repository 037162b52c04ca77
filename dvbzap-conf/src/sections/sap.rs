//! SAP announce directives.

use super::{ParseContext, Recognized, SectionParser};
use crate::error::ConfigError;
use crate::tokens::Tokens;
use crate::tristate::Tristate;

pub struct SapSection;

impl SectionParser for SapSection {
    fn section(&self) -> &'static str {
        "SAP"
    }

    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError> {
        if keyword == "sap_group" {
            let channel = ctx.channel_mut(keyword)?;
            channel.sap_group = Some(args.value(keyword)?.to_string());
            return Ok(Recognized::Handled);
        }

        let sap = &mut ctx.store.sap;
        match keyword {
            "sap" => sap.sap = Tristate::from_flag(args.int(keyword)?),
            "sap_organisation" => {
                sap.organisation = args
                    .rest_after_eq()
                    .ok_or_else(|| ConfigError::MissingValue {
                        keyword: keyword.to_string(),
                    })?
                    .to_string();
            }
            "sap_uri" => sap.uri = Some(args.value(keyword)?.to_string()),
            "sap_sending_ip" => sap.sending_ip = args.value(keyword)?.to_string(),
            "sap_interval" => sap.interval = args.uint(keyword)?,
            "sap_default_group" => sap.default_group = Some(args.value(keyword)?.to_string()),
            "sap_ttl" => sap.ttl = args.uint(keyword)?,
            _ => return Ok(Recognized::NotMine),
        }
        Ok(Recognized::Handled)
    }
}
