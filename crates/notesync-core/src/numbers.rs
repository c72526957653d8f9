//! Unit-aware number parsing for engagement counts.
//!
//! Page counters are rendered as `"1.2w"`, `"3k"`, `"1.5万"` or plain digits.
//! Everything here degrades to `0` instead of failing.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a displayed count such as `"1.2w"` or `"3千"` into an integer.
///
/// All characters except digits, `.`, `k`, `w`, `万` and `千` are stripped
/// (`k`/`w` case-insensitively). `w`/`万` multiply by 10,000, `k`/`千` by
/// 1,000. The result is rounded to the nearest integer; unparsable input
/// yields `0`.
pub fn parse_number(text: &str) -> u64 {
    let clean: String = text
        .chars()
        .filter(|c| {
            c.is_ascii_digit() || matches!(c, '.' | 'k' | 'K' | 'w' | 'W' | '万' | '千')
        })
        .collect();

    let Some(value) = leading_float(&clean) else {
        return 0;
    };

    let multiplier = if clean.contains(&['w', 'W', '万'][..]) {
        10_000.0
    } else if clean.contains(&['k', 'K', '千'][..]) {
        1_000.0
    } else {
        1.0
    };

    (value * multiplier).round() as u64
}

/// Longest leading decimal literal of `s`, the way `parseFloat` reads it.
fn leading_float(s: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                end = i + 1;
            }
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    if !seen_digit {
        return None;
    }
    s[..end].trim_end_matches('.').parse().ok()
}

/// Coerce an embedded-state JSON value into a count.
///
/// Numbers are truncated, strings go through [`parse_number`], anything else
/// is `None` so the caller can try the next source.
pub fn count_from_json(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64)),
        Value::String(s) if !s.trim().is_empty() => Some(parse_number(s)),
        _ => None,
    }
}

/// Deserialize a count that may arrive as a number, a numeric string, or junk.
///
/// Junk and `null` become `0`, matching an integer parse with zero fallback.
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::String(s) => leading_float(s.trim()).map_or(0, |f| f.trunc() as u64),
        other => count_from_json(other).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_wan_suffix() {
        assert_eq!(parse_number("1.2w"), 12000);
        assert_eq!(parse_number("1.5万"), 15000);
        assert_eq!(parse_number("2W"), 20000);
    }

    #[test]
    fn test_parse_number_thousand_suffix() {
        assert_eq!(parse_number("3k"), 3000);
        assert_eq!(parse_number("2.5千"), 2500);
        assert_eq!(parse_number("1.1K"), 1100);
    }

    #[test]
    fn test_parse_number_plain() {
        assert_eq!(parse_number("500"), 500);
        assert_eq!(parse_number(" 42 "), 42);
        assert_eq!(parse_number("12.6"), 13);
    }

    #[test]
    fn test_parse_number_unparsable() {
        assert_eq!(parse_number(""), 0);
        assert_eq!(parse_number("abc"), 0);
        assert_eq!(parse_number("赞"), 0);
    }

    #[test]
    fn test_parse_number_strips_labels() {
        assert_eq!(parse_number("粉丝 1.2万"), 12000);
        assert_eq!(parse_number("1,024"), 1024);
    }

    #[test]
    fn test_count_from_json() {
        assert_eq!(count_from_json(&serde_json::json!(17)), Some(17));
        assert_eq!(count_from_json(&serde_json::json!(3.9)), Some(3));
        assert_eq!(count_from_json(&serde_json::json!("1.2w")), Some(12000));
        assert_eq!(count_from_json(&serde_json::json!(null)), None);
        assert_eq!(count_from_json(&serde_json::json!("")), None);
        assert_eq!(count_from_json(&serde_json::json!({"a": 1})), None);
    }

    #[test]
    fn test_lenient_u64_accepts_strings_and_junk() {
        #[derive(Deserialize)]
        struct Counts {
            #[serde(deserialize_with = "lenient_u64")]
            a: u64,
            #[serde(deserialize_with = "lenient_u64")]
            b: u64,
            #[serde(deserialize_with = "lenient_u64")]
            c: u64,
        }

        let counts: Counts =
            serde_json::from_value(serde_json::json!({"a": "120", "b": 7, "c": "n/a"})).unwrap();
        assert_eq!(counts.a, 120);
        assert_eq!(counts.b, 7);
        assert_eq!(counts.c, 0);
    }
}
