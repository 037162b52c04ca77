//! Logging directives.

use log::warn;

use super::{parse_value, path_value, ParseContext, Recognized, SectionParser};
use crate::error::ConfigError;
use crate::params::LogType;
use crate::tokens::Tokens;

pub struct LoggingSection;

impl SectionParser for LoggingSection {
    fn section(&self) -> &'static str {
        "Logging"
    }

    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError> {
        let logging = &mut ctx.store.logging;
        match keyword {
            "log_type" => {
                logging.log_type = parse_value(keyword, args)?;
                if logging.log_type == LogType::Syslog {
                    warn!("syslog output is not available, logging to the console");
                }
            }
            "log_header" => logging.log_header = args.flag(keyword)?,
            "log_flush_interval" => logging.flush_interval = args.float(keyword)?,
            "log_file" => {
                if let Some(path) = path_value(keyword, args)? {
                    logging.log_file = Some(path);
                }
            }
            "show_traffic_interval" => logging.show_traffic_interval = args.uint(keyword)?,
            "compute_traffic_interval" => logging.compute_traffic_interval = args.uint(keyword)?,
            _ => return Ok(Recognized::NotMine),
        }
        Ok(Recognized::Handled)
    }
}
