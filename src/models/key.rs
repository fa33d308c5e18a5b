use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt::Display, str::FromStr};

use crate::error::{AppError, AppResult};

/// Separator between the source and the id in a compound key
pub const KEY_DELIMITER: char = '+';

/// Identifier for a title across providers: which source serves it, and the
/// source's own id for it.
///
/// The canonical string form is `source+id`. `source` may never contain the
/// delimiter, `id` may.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompoundKey {
    source: String,
    id: String,
}

impl CompoundKey {
    /// Builds a key, rejecting sources that would make the canonical form ambiguous
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> AppResult<Self> {
        let source = source.into();
        if source.is_empty() {
            return Err(AppError::InvalidInput(
                "Key source cannot be empty".to_string(),
            ));
        }
        if source.contains(KEY_DELIMITER) {
            return Err(AppError::InvalidInput(format!(
                "Key source '{}' contains reserved delimiter '{}'",
                source, KEY_DELIMITER
            )));
        }

        Ok(Self {
            source,
            id: id.into(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn into_parts(self) -> (String, String) {
        (self.source, self.id)
    }
}

/// Joins `(source, id)` into the canonical key string
pub fn encode(source: &str, id: &str) -> AppResult<String> {
    CompoundKey::new(source, id).map(|key| key.to_string())
}

/// Splits a canonical key string at the first delimiter
pub fn decode(key: &str) -> AppResult<(String, String)> {
    key.parse::<CompoundKey>().map(CompoundKey::into_parts)
}

impl Display for CompoundKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.source, KEY_DELIMITER, self.id)
    }
}

impl FromStr for CompoundKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, id) = s.split_once(KEY_DELIMITER).ok_or_else(|| {
            AppError::InvalidInput(format!("Malformed key '{}': missing delimiter", s))
        })?;
        CompoundKey::new(source, id)
    }
}

impl Serialize for CompoundKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CompoundKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
