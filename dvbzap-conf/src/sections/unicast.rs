//! HTTP unicast directives.

use super::{port_value, ParseContext, Recognized, SectionParser};
use crate::error::ConfigError;
use crate::tokens::Tokens;

pub struct UnicastSection;

impl SectionParser for UnicastSection {
    fn section(&self) -> &'static str {
        "Unicast"
    }

    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError> {
        if keyword == "unicast_port" {
            let channel = ctx.channel_mut(keyword)?;
            channel.unicast_port = Some(port_value(keyword, args)?);
            return Ok(Recognized::Handled);
        }

        let unicast = &mut ctx.store.unicast;
        match keyword {
            "unicast" => unicast.unicast = args.flag(keyword)?,
            "ip_http" => unicast.ip_http = args.value(keyword)?.to_string(),
            "port_http" => {
                // Port expressions such as "4000 + %card" may contain spaces.
                let expr: String = args
                    .rest_after_eq()
                    .ok_or_else(|| ConfigError::MissingValue {
                        keyword: keyword.to_string(),
                    })?
                    .split_whitespace()
                    .collect();
                unicast.port_out_str = Some(expr);
            }
            "unicast_max_clients" => unicast.max_clients = args.uint(keyword)?,
            "unicast_consecutive_errors_timeout" => {
                unicast.consecutive_errors_timeout = args.uint(keyword)?
            }
            "unicast_queue_size" => unicast.queue_size = args.uint(keyword)?,
            _ => return Ok(Recognized::NotMine),
        }
        Ok(Recognized::Handled)
    }
}
