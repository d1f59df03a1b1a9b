use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// Length of an identifier in hex characters (12 bytes)
pub const OBJECT_ID_HEX_LEN: usize = 24;

/// Store-assigned identifier of a todo, always 24 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct ObjectId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid object id: {0:?}")]
pub struct InvalidObjectId(pub(crate) String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != OBJECT_ID_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidObjectId(s.to_string()));
        }
        Ok(ObjectId(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// Data model representing a Todo item
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Todo {
    #[serde(rename = "_id")]
    pub(crate) id: ObjectId,
    pub(crate) completed: bool,
    pub(crate) body: String,
}

// A Todo that has not been persisted yet, so it has no id
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub(crate) body: String,
    pub(crate) completed: bool,
}

impl NewTodo {
    pub fn new(body: impl Into<String>) -> Self {
        NewTodo {
            body: body.into(),
            completed: false,
        }
    }
}
