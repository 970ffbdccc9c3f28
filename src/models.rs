use crate::types::Repository;
use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key under which the access token lives in the preferences document.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%#z";

/// Parsed `updated_at` value of a repository.
///
/// A timestamp that cannot be parsed is not an error; it renders as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastUpdate {
    At(DateTime<FixedOffset>),
    Unknown,
}

impl LastUpdate {
    pub fn parse(raw: &str) -> Self {
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, WIRE_FORMAT))
            .map(LastUpdate::At)
            .unwrap_or(LastUpdate::Unknown)
    }

    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            LastUpdate::At(at) => Some(*at),
            LastUpdate::Unknown => None,
        }
    }

    /// Render in the given zone as `yyyy-MM-dd HH:mm:ss`.
    pub fn display_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        match self {
            LastUpdate::At(at) => at.with_timezone(tz).format(DISPLAY_FORMAT).to_string(),
            LastUpdate::Unknown => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for LastUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_in(&Local))
    }
}

/// The per-application preferences document persisted by the credential store.
///
/// Keys other than [`AUTH_TOKEN_KEY`] are carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences {
    entries: BTreeMap<String, serde_json::Value>,
}

impl Preferences {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|v| v.as_str())
    }

    pub fn set_str(&mut self, key: &str, value: &str) {
        self.entries
            .insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A repository the user opened, as kept in the history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub repository: Repository,
    pub viewed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zulu_suffix() {
        let update = LastUpdate::parse("2020-01-02T03:04:05Z");
        assert_eq!(update.display_in(&Utc), "2020-01-02 03:04:05");
    }

    #[test]
    fn parses_numeric_offsets() {
        let with_colon = LastUpdate::parse("2020-01-02T12:04:05+09:00");
        let without_colon = LastUpdate::parse("2020-01-02T12:04:05+0900");
        assert_eq!(with_colon.display_in(&Utc), "2020-01-02 03:04:05");
        assert_eq!(without_colon, with_colon);
    }

    #[test]
    fn unparseable_is_unknown() {
        assert_eq!(LastUpdate::parse("yesterday"), LastUpdate::Unknown);
        assert_eq!(LastUpdate::parse("").display_in(&Utc), "Unknown");
        assert!(LastUpdate::parse("2020-13-40T00:00:00Z").timestamp().is_none());
    }

    #[test]
    fn preferences_keep_unrelated_keys() {
        let mut prefs: Preferences =
            serde_json::from_str(r#"{"theme":"dark","auth_token":"old"}"#).unwrap();
        prefs.set_str(AUTH_TOKEN_KEY, "new");
        assert_eq!(prefs.get_str(AUTH_TOKEN_KEY), Some("new"));
        assert!(prefs.remove(AUTH_TOKEN_KEY));
        assert_eq!(prefs.get_str("theme"), Some("dark"));
        assert_eq!(prefs.len(), 1);
    }
}
