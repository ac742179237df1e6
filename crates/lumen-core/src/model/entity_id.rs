// ── Core identity types ──
//
// EntityId and MacAddress are shared by every hierarchy level. Ids arrive
// as JSON numbers from the backend and as strings from the command line;
// both compare equal when their text matches.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

// ── EntityId ────────────────────────────────────────────────────────

/// Identifier of a Zone, Group, Location or Device.
///
/// Unique only within its parent collection. Numeric ids are the norm;
/// anything else is carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(serde_json::Number),
    Text(String),
}

impl EntityId {
    /// Numeric value, also for digit-only strings.
    pub fn numeric(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Next id for a collection: highest numeric id plus one, or 1 when
    /// the collection has no numeric ids.
    pub fn next_after<'a>(ids: impl IntoIterator<Item = &'a EntityId>) -> Self {
        let max = ids.into_iter().filter_map(Self::numeric).max().unwrap_or(0);
        Self::from(max.saturating_add(1))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<u64>() {
            Ok(n) => Self::from(n),
            Err(_) => Self::Text(s.to_owned()),
        })
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
///
/// Inputs that do not carry exactly twelve hex digits are kept lowercased
/// as-is so no data is lost.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated, dash-separated, dotted, or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().trim();
        let hex: Vec<char> = raw
            .chars()
            .filter(char::is_ascii_hexdigit)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let separators_only = raw
            .chars()
            .all(|c| c.is_ascii_hexdigit() || matches!(c, ':' | '-' | '.'));

        if hex.len() == 12 && separators_only {
            let pairs: Vec<String> = hex.chunks(2).map(|p| p.iter().collect()).collect();
            Self(pairs.join(":"))
        } else {
            Self(raw.to_lowercase())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        // Some writers stored digit-only addresses as bare numbers.
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(raw) => Ok(Self::new(raw)),
            serde_json::Value::Number(n) => Ok(Self::new(n.to_string())),
            other => Err(D::Error::custom(format!("expected a MAC address, got {other}"))),
        }
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn number_and_text_ids_compare_by_text() {
        let a: EntityId = serde_json::from_str("7").unwrap();
        let b = EntityId::from("7");
        assert_eq!(a, b);

        let set: HashSet<EntityId> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn entity_id_from_str_prefers_numbers() {
        let id: EntityId = "42".parse().unwrap();
        assert!(matches!(id, EntityId::Number(_)));
        let id: EntityId = "kitchen".parse().unwrap();
        assert_eq!(id, EntityId::Text("kitchen".into()));
        assert_eq!(id.numeric(), None);
    }

    #[test]
    fn mac_address_reads_numbers_as_text() {
        let mac: MacAddress = serde_json::from_value(serde_json::json!(12345)).unwrap();
        assert_eq!(mac.as_str(), "12345");
        let mac: MacAddress = serde_json::from_value(serde_json::json!("AABBCCDDEEFF")).unwrap();
        assert_eq!(mac.as_str(), "aa:bb:cc:dd:ee:ff");
        assert!(serde_json::from_value::<MacAddress>(serde_json::json!([1])).is_err());
    }

    #[test]
    fn next_after_takes_max_plus_one() {
        let ids = [EntityId::from(1), EntityId::from(3), EntityId::from(7)];
        assert_eq!(EntityId::next_after(&ids), EntityId::from(8));
    }

    #[test]
    fn next_after_ignores_non_numeric_and_starts_at_one() {
        assert_eq!(EntityId::next_after(std::iter::empty()), EntityId::from(1));
        let ids = [EntityId::from("abc"), EntityId::from("4")];
        assert_eq!(EntityId::next_after(&ids), EntityId::from(5));
    }

    #[test]
    fn entity_id_serializes_in_original_shape() {
        assert_eq!(serde_json::to_string(&EntityId::from(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&EntityId::from("x")).unwrap(), "\"x\"");
    }

    #[test]
    fn mac_address_normalizes_dashes() {
        let mac = MacAddress::new("AA-BB-CC-DD-EE-FF");
        assert_eq!(mac.as_str(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn mac_address_normalizes_bare_hex() {
        let mac = MacAddress::new("AABBCCDDEEFF");
        assert_eq!(mac.as_str(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn mac_address_keeps_unrecognized_input() {
        let mac = MacAddress::new("Not-A-Mac");
        assert_eq!(mac.as_str(), "not-a-mac");
    }

    #[test]
    fn mac_address_deserializes_normalized() {
        let mac: MacAddress = serde_json::from_str("\"AA:BB:CC:DD:EE:FF\"").unwrap();
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }
}
