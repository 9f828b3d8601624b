use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One page to crawl
///
/// Deserialized from backend article rows (`{id, url_origin, ...}`); unknown
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Article id; the backend may send it as a string or a number
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,

    /// URL the tab is pointed at
    #[serde(rename = "url_origin")]
    pub origin_url: String,

    #[serde(rename = "path", default, skip_serializing_if = "Option::is_none")]
    pub path_hint: Option<String>,
}

impl Target {
    pub fn new(id: impl Into<String>, origin_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            origin_url: origin_url.into(),
            path_hint: None,
        }
    }

    pub fn with_path_hint(mut self, hint: impl Into<String>) -> Self {
        self.path_hint = Some(hint.into());
        self
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Which article rows to crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetFilter {
    #[default]
    All,
    Failed,
    Success,
}

impl TargetFilter {
    /// Value of the `status` query parameter, if any
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Failed => Some("failed"),
            Self::Success => Some("success"),
        }
    }
}

impl fmt::Display for TargetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query_value().unwrap_or("all"))
    }
}
