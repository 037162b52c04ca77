//! `%card`, `%tuner` and `%server` template expansion.
//!
//! Expansion is plain substring replacement; the expanded value is never
//! interpreted as a format string. Port templates may expand to a small
//! arithmetic expression such as `2000+100*1`, evaluated by [`compute`].

use nom::branch::alt;
use nom::character::complete::{char as ch, digit1, multispace0};
use nom::combinator::{all_consuming, map_res};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;

/// Values substituted for the template tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateValues {
    pub card: u32,
    pub tuner: u32,
    pub server: i64,
}

impl TemplateValues {
    /// Expand every token, in `%card`, `%tuner`, `%server` order.
    pub fn expand(&self, template: &str) -> String {
        let expanded = replace_token(template, "%card", &self.card.to_string());
        let expanded = replace_token(&expanded, "%tuner", &self.tuner.to_string());
        replace_token(&expanded, "%server", &self.server.to_string())
    }
}

/// Replace every occurrence of `token` with `value`.
pub fn replace_token(template: &str, token: &str, value: &str) -> String {
    template.replace(token, value)
}

fn number(input: &str) -> IResult<&str, i64> {
    delimited(multispace0, map_res(digit1, |s: &str| s.parse::<i64>()), multispace0)(input)
}

fn product(input: &str) -> IResult<&str, i64> {
    let (input, first) = number(input)?;
    let (input, rest) = many0(preceded(ch('*'), number))(input)?;
    Ok((input, rest.into_iter().fold(first, i64::saturating_mul)))
}

fn sum(input: &str) -> IResult<&str, i64> {
    let (input, first) = product(input)?;
    let (input, rest) = many0(pair(alt((ch('+'), ch('-'))), product))(input)?;
    let total = rest.into_iter().fold(first, |acc, (op, value)| match op {
        '+' => acc.saturating_add(value),
        _ => acc.saturating_sub(value),
    });
    Ok((input, total))
}

/// Evaluate an expression made of integers, `+`, `-` and `*`.
///
/// Returns `None` when the whole string is not a valid expression.
pub fn compute(expression: &str) -> Option<i64> {
    all_consuming(sum)(expression).ok().map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUES: TemplateValues = TemplateValues {
        card: 2,
        tuner: 1,
        server: 7,
    };

    #[test]
    fn test_expand_all_tokens() {
        assert_eq!(
            VALUES.expand("/var/log/dvbzap_%card_%tuner_%server.log"),
            "/var/log/dvbzap_2_1_7.log"
        );
        assert_eq!(VALUES.expand("/dev/dvb/adapter%card"), "/dev/dvb/adapter2");
        assert_eq!(VALUES.expand("no tokens"), "no tokens");
        assert_eq!(VALUES.expand("%card%card"), "22");
    }

    #[test]
    fn test_expansion_order_independent() {
        let template = "%server/%tuner/%card/%card-%tuner";
        let values = [
            ("%card", VALUES.card.to_string()),
            ("%tuner", VALUES.tuner.to_string()),
            ("%server", VALUES.server.to_string()),
        ];
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let expected = VALUES.expand(template);
        for order in orders {
            let mut out = template.to_string();
            for i in order {
                out = replace_token(&out, values[i].0, &values[i].1);
            }
            assert_eq!(out, expected, "order {:?}", order);
        }
    }

    #[test]
    fn test_expanded_value_not_a_format_string() {
        assert_eq!(VALUES.expand("%s%d%%card"), "%s%d%2");
    }

    #[test]
    fn test_compute_expressions() {
        assert_eq!(compute("4242"), Some(4242));
        assert_eq!(compute("2000+100*2"), Some(2200));
        assert_eq!(compute(" 2000 + 3 * 10 - 1 "), Some(2029));
        assert_eq!(compute("2*3*4"), Some(24));
        assert_eq!(compute("2000+"), None);
        assert_eq!(compute("port"), None);
        assert_eq!(compute(""), None);
    }
}
