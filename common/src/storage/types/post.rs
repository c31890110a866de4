use serde::{Deserialize, Serialize};

/// Field names as stored in the index.
pub mod fields {
    pub const EXTERNAL_KEY: &str = "TweetID";
    pub const CREATED_AT: &str = "CreateDate";
    pub const LABEL_FLAG: &str = "Antisemitic";
    pub const TEXT: &str = "text";
    pub const SENTIMENT: &str = "sentiment";
    pub const WEAPONS: &str = "weapons";
}

/// `labelFlag` value marking a post as antisemitic.
pub const ANTISEMITIC_FLAG: i8 = 1;

/// One social-media post as held in the index.
///
/// `sentiment` and `weapons` are written by the enrichment stages and are absent
/// on freshly ingested documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    #[serde(rename = "TweetID", with = "base64_key")]
    pub external_key: String,
    #[serde(rename = "CreateDate")]
    pub created_at: String,
    #[serde(rename = "Antisemitic")]
    pub label_flag: i8,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapons: Option<Vec<String>>,
}

impl Post {
    pub fn new(external_key: String, created_at: String, label_flag: i8, text: String) -> Self {
        Self {
            external_key,
            created_at,
            label_flag,
            text,
            sentiment: None,
            weapons: None,
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.label_flag == ANTISEMITIC_FLAG
    }
}

// `TweetID` is mapped as `binary`, which the store only accepts as base64.
mod base64_key {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(key: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(key.as_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        // Documents written by other tools may hold the raw key.
        Ok(STANDARD
            .decode(raw.as_bytes())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .unwrap_or(raw))
    }
}
