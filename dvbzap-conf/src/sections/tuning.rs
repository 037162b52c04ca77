//! Tuning directives: frequency, polarization, LNB and device selection.

use super::{parse_value, path_value, ParseContext, Recognized, SectionParser};
use crate::error::ConfigError;
use crate::tokens::Tokens;

/// Highest DiSEqC position supported by a committed switch.
const MAX_SAT_NUMBER: u32 = 4;

pub struct TuningSection;

impl SectionParser for TuningSection {
    fn section(&self) -> &'static str {
        "Tune"
    }

    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError> {
        let tune = &mut ctx.store.tuning;
        match keyword {
            "freq" => tune.freq = args.float(keyword)?,
            "pol" | "polarization" => tune.pol = Some(parse_value(keyword, args)?),
            "srate" => tune.srate = args.uint(keyword)?,
            "card" => tune.card = Some(args.uint(keyword)?),
            "tuner" => tune.tuner = args.uint(keyword)?,
            "card_dev_path" => {
                if let Some(path) = path_value(keyword, args)? {
                    tune.card_dev_path = path;
                }
            }
            "tuning_timeout" => tune.tuning_timeout = args.uint(keyword)?,
            "delivery_system" => tune.delivery_system = Some(parse_value(keyword, args)?),
            "modulation" => tune.modulation = Some(args.value(keyword)?.to_string()),
            "bandwidth" => tune.bandwidth = args.uint(keyword)?,
            "lnb_type" => tune.lnb.lnb_type = parse_value(keyword, args)?,
            "lnb_lof_standard" => tune.lnb.lof_standard = args.uint(keyword)?,
            "lnb_slof" => tune.lnb.slof = args.uint(keyword)?,
            "lnb_lof_low" => tune.lnb.lof_low = args.uint(keyword)?,
            "lnb_lof_high" => tune.lnb.lof_high = args.uint(keyword)?,
            "lnb_voltage_off" => tune.lnb.voltage_off = args.flag(keyword)?,
            "sat_number" => {
                let raw = args.value(keyword)?;
                match u8::try_from(crate::tokens::atoi(raw)) {
                    Ok(n) if u32::from(n) <= MAX_SAT_NUMBER => tune.sat_number = n,
                    _ => return Err(ConfigError::invalid(keyword, raw)),
                }
            }
            "read_file_path" => {
                if let Some(path) = path_value(keyword, args)? {
                    tune.read_file_path = Some(path);
                }
            }
            _ => return Ok(Recognized::NotMine),
        }
        Ok(Recognized::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{DeliverySystem, ParameterStore, Polarization};

    fn parse(store: &mut ParameterStore, line: &str) -> Result<Recognized, ConfigError> {
        let mut tokens = Tokens::new(line);
        let keyword = tokens.next_token().unwrap();
        TuningSection.try_parse(&mut ParseContext::new(store, None), keyword, &mut tokens)
    }

    #[test]
    fn test_tuning_directives() {
        let mut store = ParameterStore::new();
        assert_eq!(parse(&mut store, "freq = 11778").unwrap(), Recognized::Handled);
        assert_eq!(parse(&mut store, "pol = v").unwrap(), Recognized::Handled);
        assert_eq!(parse(&mut store, "srate = 27500").unwrap(), Recognized::Handled);
        assert_eq!(parse(&mut store, "card = 1").unwrap(), Recognized::Handled);
        assert_eq!(parse(&mut store, "delivery_system = DVBS2").unwrap(), Recognized::Handled);
        assert_eq!(parse(&mut store, "tuning_timeout = 5").unwrap(), Recognized::Handled);

        assert_eq!(store.tuning.freq, 11778.0);
        assert_eq!(store.tuning.pol, Some(Polarization::Vertical));
        assert_eq!(store.tuning.srate, 27500);
        assert_eq!(store.tuning.card, Some(1));
        assert_eq!(store.tuning.delivery_system, Some(DeliverySystem::DvbS2));
        assert_eq!(store.tuning.tuning_timeout, 5);
    }

    #[test]
    fn test_not_mine_leaves_tokens() {
        let mut store = ParameterStore::new();
        let mut tokens = Tokens::new("sap = 1");
        let keyword = tokens.next_token().unwrap();
        let answer = TuningSection
            .try_parse(&mut ParseContext::new(&mut store, None), keyword, &mut tokens)
            .unwrap();
        assert_eq!(answer, Recognized::NotMine);
        assert_eq!(tokens.next_token(), Some("1"));
    }

    #[test]
    fn test_invalid_values() {
        let mut store = ParameterStore::new();
        assert!(matches!(
            parse(&mut store, "pol = x"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&mut store, "sat_number = 9"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&mut store, "freq"),
            Err(ConfigError::MissingValue { .. })
        ));
    }
}
