//! PSI rewrite directives.

use super::{ParseContext, Recognized, SectionParser};
use crate::error::ConfigError;
use crate::tokens::Tokens;
use crate::tristate::Tristate;

pub struct RewriteSection;

impl SectionParser for RewriteSection {
    fn section(&self) -> &'static str {
        "Rewrite"
    }

    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError> {
        let rewrite = &mut ctx.store.rewrite;
        match keyword {
            "rewrite_pat" => rewrite.rewrite_pat = Tristate::from_flag(args.int(keyword)?),
            "rewrite_sdt" => rewrite.rewrite_sdt = Tristate::from_flag(args.int(keyword)?),
            "rewrite_eit" => rewrite.rewrite_eit = args.flag(keyword)?,
            "sdt_force_eit" => rewrite.sdt_force_eit = args.flag(keyword)?,
            _ => return Ok(Recognized::NotMine),
        }
        Ok(Recognized::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterStore;

    #[test]
    fn test_explicit_off_survives() {
        let mut store = ParameterStore::new();
        let mut tokens = Tokens::new("rewrite_pat = 0");
        let keyword = tokens.next_token().unwrap();
        RewriteSection
            .try_parse(&mut ParseContext::new(&mut store, None), keyword, &mut tokens)
            .unwrap();
        assert_eq!(store.rewrite.rewrite_pat, Tristate::Off);
        assert_eq!(store.rewrite.rewrite_sdt, Tristate::Undefined);
    }
}
