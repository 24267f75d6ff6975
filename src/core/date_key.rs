//! Fixed-width session date tokens.
//!
//! Sessions and events are keyed by 12-digit tokens laid out as
//! `ddMMyyhhmmss`. The literal field order does not sort chronologically,
//! so [`DateKey`] orders by (year, month, day, hour, minute, second).

use crate::error::DateKeyError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Length of a date token in characters.
pub const TOKEN_LEN: usize = 12;

/// A parsed `ddMMyyhhmmss` date token.
///
/// Equality is on the token itself; ordering is chronological.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey {
    token: String,
}

impl DateKey {
    /// Parse a 12-digit token.
    pub fn parse(token: &str) -> Result<Self, DateKeyError> {
        if token.len() != TOKEN_LEN || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DateKeyError::Malformed(token.to_string()));
        }
        Ok(Self {
            token: token.to_string(),
        })
    }

    /// The original wire token.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Two-character field `index` (0 = day ... 5 = second).
    fn field(&self, index: usize) -> &str {
        &self.token[index * 2..index * 2 + 2]
    }

    pub fn day(&self) -> u8 {
        self.numeric(0)
    }

    pub fn month(&self) -> u8 {
        self.numeric(1)
    }

    /// Two-digit year, never century-normalized.
    pub fn year(&self) -> u8 {
        self.numeric(2)
    }

    pub fn hour(&self) -> u8 {
        self.numeric(3)
    }

    pub fn minute(&self) -> u8 {
        self.numeric(4)
    }

    pub fn second(&self) -> u8 {
        self.numeric(5)
    }

    fn numeric(&self, index: usize) -> u8 {
        let bytes = self.field(index).as_bytes();
        (bytes[0] - b'0') * 10 + (bytes[1] - b'0')
    }

    /// Fields in chronological precedence.
    fn chronological(&self) -> [&str; 6] {
        [
            self.field(2),
            self.field(1),
            self.field(0),
            self.field(3),
            self.field(4),
            self.field(5),
        ]
    }

    /// Render as `dd.MM.yy hh:mm:ss`.
    pub fn format_readable(&self) -> String {
        format!(
            "{}.{}.{} {}:{}:{}",
            self.field(0),
            self.field(1),
            self.field(2),
            self.field(3),
            self.field(4),
            self.field(5)
        )
    }
}

impl Ord for DateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chronological().cmp(&other.chronological())
    }
}

impl PartialOrd for DateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DateKey {
    type Error = DateKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.token
    }
}

/// Parse and sort tokens chronologically. Equal keys keep their input order.
pub fn sort_tokens<I, S>(tokens: I) -> Result<Vec<DateKey>, DateKeyError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut keys = tokens
        .into_iter()
        .map(|t| DateKey::parse(t.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    keys.sort();
    Ok(keys)
}

/// Sort tokens chronologically and render each as `dd.MM.yy hh:mm:ss`.
pub fn sort_readable<I, S>(tokens: I) -> Result<Vec<String>, DateKeyError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(sort_tokens(tokens)?
        .iter()
        .map(DateKey::format_readable)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(token: &str) -> DateKey {
        DateKey::parse(token).unwrap()
    }

    #[test]
    fn test_parse_rejects_malformed_tokens() {
        assert!(DateKey::parse("070717004643").is_ok());
        assert!(DateKey::parse("07071700464").is_err());
        assert!(DateKey::parse("0707170046431").is_err());
        assert!(DateKey::parse("07071700464a").is_err());
        assert!(DateKey::parse("").is_err());
        assert_eq!(
            DateKey::parse("MetaData"),
            Err(DateKeyError::Malformed("MetaData".to_string()))
        );
    }

    #[test]
    fn test_fields() {
        let k = key("311223235958");
        assert_eq!(k.day(), 31);
        assert_eq!(k.month(), 12);
        assert_eq!(k.year(), 23);
        assert_eq!(k.hour(), 23);
        assert_eq!(k.minute(), 59);
        assert_eq!(k.second(), 58);
    }

    #[test]
    fn test_year_boundary_ordering() {
        let dec = key("311223120000");
        let jan = key("010124080000");
        assert!(dec < jan);
        // Raw string order disagrees
        assert!(dec.as_str() > jan.as_str());
    }

    #[test]
    fn test_time_breaks_ties_within_a_day() {
        let morning = key("050317081500");
        let evening = key("050317201500");
        let evening_later = key("050317201501");
        assert!(morning < evening);
        assert!(evening < evening_later);
    }

    #[test]
    fn test_order_properties() {
        let tokens = [
            "010124080000",
            "311223120000",
            "150623000000",
            "150623000001",
            "010101000000",
            "311299235959",
        ];
        let keys: Vec<DateKey> = tokens.iter().map(|t| key(t)).collect();

        for a in &keys {
            for b in &keys {
                // Antisymmetry
                if a <= b && b <= a {
                    assert_eq!(a, b);
                }
                for c in &keys {
                    // Transitivity
                    if a <= b && b <= c {
                        assert!(a <= c);
                    }
                }
            }
        }
    }

    #[test]
    fn test_sort_is_idempotent() {
        let sorted = sort_tokens(["010124080000", "311223120000", "150623000000"]).unwrap();
        let again = sort_tokens(sorted.iter().map(DateKey::as_str)).unwrap();
        assert_eq!(sorted, again);
        assert_eq!(
            sorted.iter().map(DateKey::as_str).collect::<Vec<_>>(),
            vec!["150623000000", "311223120000", "010124080000"]
        );
    }

    #[test]
    fn test_sort_propagates_malformed() {
        assert!(sort_tokens(["010124080000", "bogus"]).is_err());
    }

    #[test]
    fn test_format_readable() {
        assert_eq!(key("070717004643").format_readable(), "07.07.17 00:46:43");
        assert_eq!(
            sort_readable(["010124080000", "311223120000"]).unwrap(),
            vec!["31.12.23 12:00:00", "01.01.24 08:00:00"]
        );
    }

    #[test]
    fn test_serde_uses_wire_token() {
        let k = key("070717004643");
        let json = serde_json::to_string(&k).unwrap();
        assert_eq!(json, "\"070717004643\"");

        let back: DateKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, k);

        assert!(serde_json::from_str::<DateKey>("\"07-07-17\"").is_err());
    }
}
