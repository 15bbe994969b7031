use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Feature flags a model advertises. Anything the catalog omits is false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCapabilities {
    pub image: bool,
    pub mcp: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelVariants {
    /// Base variants back other entries and are never offered for selection.
    pub base: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelBilling {
    pub in_billing: f64,
    pub out_billing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub model_name: String,
    #[serde(default)]
    pub model_alias: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: ModelCapabilities,
    #[serde(default)]
    pub variants: ModelVariants,
    #[serde(default)]
    pub billing: ModelBilling,
}

#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub starred: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub starred_at: Option<DateTime<Utc>>,
    /// Local-only marker for in-flight per-conversation operations.
    #[serde(skip)]
    pub is_loading: bool,
}

/// Accepts RFC 3339 as well as offset-less ISO timestamps, which are read as
/// UTC. Anything else becomes `None` so one odd row cannot sink the list.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(stamp) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(stamp.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc()))
}

impl Conversation {
    pub fn new(conversation_id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            alias: alias.into(),
            starred: false,
            starred_at: None,
            is_loading: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadPageRequest {
    pub unique_id: String,
    pub html: String,
    pub stylesheets: Vec<String>,
    pub title: String,
}

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Failure body shape shared by every endpoint.
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub detail: Option<serde_json::Value>,
}

impl ErrorDetail {
    /// Human-readable detail text, if the body carried a usable one.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            serde_json::Value::Null => None,
            serde_json::Value::String(_) => None,
            other => Some(other.to_string()),
        }
    }
}

pub mod client;
