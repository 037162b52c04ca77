//! Autoconfiguration directives.

use log::info;

use super::{parse_value, ParseContext, Recognized, SectionParser};
use crate::error::ConfigError;
use crate::tokens::{atoi, Tokens};

pub struct AutoconfSection;

impl SectionParser for AutoconfSection {
    fn section(&self) -> &'static str {
        "Autoconf"
    }

    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError> {
        let auto = &mut ctx.store.autoconf;
        match keyword {
            "autoconfiguration" => {
                auto.mode = parse_value(keyword, args)?;
                if auto.is_enabled() {
                    info!("Full autoconfiguration, we activate SAP announces if multicast is on");
                }
            }
            "autoconf_radios" => auto.radios = args.flag(keyword)?,
            "autoconf_scrambled" => auto.scrambled = args.flag(keyword)?,
            "autoconf_pid_update" => auto.pid_update = args.flag(keyword)?,
            "autoconf_ip4" => auto.ip4_template = args.value(keyword)?.to_string(),
            "autoconf_name_template" => {
                auto.name_template = Some(
                    args.rest_after_eq()
                        .ok_or_else(|| ConfigError::MissingValue {
                            keyword: keyword.to_string(),
                        })?
                        .to_string(),
                );
            }
            "autoconf_sid_list" => {
                let mut sids = Vec::new();
                for raw in args.by_ref() {
                    let sid =
                        u16::try_from(atoi(raw)).map_err(|_| ConfigError::invalid(keyword, raw))?;
                    sids.push(sid);
                }
                auto.sid_list = sids;
            }
            _ => return Ok(Recognized::NotMine),
        }
        Ok(Recognized::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{AutoconfMode, ParameterStore};

    fn parse(store: &mut ParameterStore, line: &str) -> Result<Recognized, ConfigError> {
        let mut tokens = Tokens::new(line);
        let keyword = tokens.next_token().unwrap();
        AutoconfSection.try_parse(&mut ParseContext::new(store, None), keyword, &mut tokens)
    }

    #[test]
    fn test_autoconfiguration_modes() {
        let mut store = ParameterStore::new();
        parse(&mut store, "autoconfiguration = full").unwrap();
        assert_eq!(store.autoconf.mode, AutoconfMode::Full);
        parse(&mut store, "autoconfiguration = none").unwrap();
        assert!(!store.autoconf.is_enabled());
        assert!(parse(&mut store, "autoconfiguration = maybe").is_err());
    }

    #[test]
    fn test_sid_list_and_template() {
        let mut store = ParameterStore::new();
        parse(&mut store, "autoconf_sid_list = 1 2 300").unwrap();
        assert_eq!(store.autoconf.sid_list, vec![1, 2, 300]);

        parse(&mut store, "autoconf_name_template = %number %name").unwrap();
        assert_eq!(store.autoconf.name_template.as_deref(), Some("%number %name"));

        assert!(parse(&mut store, "autoconf_sid_list = 70000").is_err());
    }
}
