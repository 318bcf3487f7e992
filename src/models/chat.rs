use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use uuid::Uuid;

/// Prefix carried by ids the client invents before the server has persisted a message.
pub const LOCAL_ID_PREFIX: &str = "local-";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub role: Role,
    pub content: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Builds the optimistic copy of a user message shown while the send is in flight.
    pub fn local_user(conversation_id: Option<String>, content: impl Into<String>) -> Self {
        Self {
            id: format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4()),
            conversation_id,
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }
}

// The backend emits ISO 8601 strings; older rows were written without an offset.
mod timestamp {
    use chrono::{ DateTime, NaiveDateTime, Utc };
    use serde::{ de, Deserialize, Deserializer };

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
        where D: Deserializer<'de>
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where D: Deserializer<'de>
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) =>
                parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw))),
            None => Ok(None),
        }
    }
}
