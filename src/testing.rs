//! In-memory `ChatApi` used by unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{ TimeZone, Utc };
use futures::stream::{ self, StreamExt };
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::{ ApiError, ByteStream, ChatApi };
use crate::models::{ Conversation, Message, Role };

pub fn conversation(id: &str) -> Conversation {
    Conversation {
        id: id.to_string(),
        title: format!("title {}", id),
        created_at: None,
        updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
    }
}

fn message(conversation_id: &str, id: &str, role: Role, content: &str) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: Some(conversation_id.to_string()),
        role,
        content: content.to_string(),
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
    }
}

pub fn user(conversation_id: &str, id: &str, content: &str) -> Message {
    message(conversation_id, id, Role::User, content)
}

pub fn assistant(conversation_id: &str, id: &str, content: &str) -> Message {
    message(conversation_id, id, Role::Assistant, content)
}

/// NDJSON line for an assistant reply.
pub fn reply_line(conversation_id: &str, id: &str, content: &str) -> String {
    let event = crate::models::StreamEvent::Message(assistant(conversation_id, id, content));
    format!("{}\n", serde_json::to_string(&event).unwrap())
}

#[derive(Clone, Debug)]
pub enum Reply {
    /// Body delivered as these chunks, then closed.
    Chunks(Vec<String>),
    /// Body delivers these chunks and then never finishes.
    Hang(Vec<String>),
    /// The POST itself is rejected.
    Reject,
}

#[derive(Default)]
struct FakeState {
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<Message>>,
    next_id: usize,
    reply: Option<Reply>,
    fail_creates: bool,
    fail_deletes: bool,
    fail_lists: bool,
    sends: Vec<(String, String)>,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

fn server_error(method: &'static str, url: &str) -> ApiError {
    ApiError::Status { method, url: format!("fake://{}", url), status: StatusCode::INTERNAL_SERVER_ERROR }
}

impl FakeApi {
    pub fn with_conversations(conversations: Vec<Conversation>) -> Self {
        let api = Self::default();
        api.state.lock().unwrap().conversations = conversations;
        api
    }

    pub fn set_messages(&self, conversation_id: &str, messages: Vec<Message>) {
        self.state.lock().unwrap().messages.insert(conversation_id.to_string(), messages);
    }

    pub fn set_reply(&self, reply: Reply) {
        self.state.lock().unwrap().reply = Some(reply);
    }

    pub fn fail_creates(&self, fail: bool) {
        self.state.lock().unwrap().fail_creates = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.state.lock().unwrap().fail_deletes = fail;
    }

    pub fn fail_lists(&self, fail: bool) {
        self.state.lock().unwrap().fail_lists = fail;
    }

    /// (conversation id, content) of every send received.
    pub fn sends(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().sends.clone()
    }

    pub fn rename(&self, id: &str, title: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(conv) = state.conversations.iter_mut().find(|c| c.id == id) {
            conv.title = title.to_string();
        }
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn health(&self) -> Result<String, ApiError> {
        Ok("fake backend".to_string())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let state = self.state.lock().unwrap();
        if state.fail_lists {
            return Err(server_error("GET", "conversations"));
        }
        Ok(state.conversations.clone())
    }

    async fn create_conversation(&self, title: &str) -> Result<Conversation, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_creates {
            return Err(server_error("POST", "conversations"));
        }
        state.next_id += 1;
        let mut created = conversation(&format!("new-{}", state.next_id));
        created.title = title.to_string();
        state.conversations.insert(0, created.clone());
        Ok(created)
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes {
            return Err(server_error("DELETE", id));
        }
        let before = state.conversations.len();
        state.conversations.retain(|c| c.id != id);
        if state.conversations.len() == before {
            return Err(ApiError::Status {
                method: "DELETE",
                url: format!("fake://conversations/{}", id),
                status: StatusCode::NOT_FOUND,
            });
        }
        state.messages.remove(id);
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        let state = self.state.lock().unwrap();
        if state.fail_lists {
            return Err(server_error("GET", conversation_id));
        }
        Ok(state.messages.get(conversation_id).cloned().unwrap_or_default())
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str
    ) -> Result<ByteStream, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.sends.push((conversation_id.to_string(), content.to_string()));

        let chunks = |chunks: Vec<String>| {
            stream::iter(chunks.into_iter().map(|c| Ok::<Bytes, ApiError>(Bytes::from(c))))
        };
        match state.reply.clone().unwrap_or(Reply::Chunks(Vec::new())) {
            Reply::Chunks(parts) => Ok(Box::pin(chunks(parts))),
            Reply::Hang(parts) => Ok(Box::pin(chunks(parts).chain(stream::pending()))),
            Reply::Reject => Err(server_error("POST", conversation_id)),
        }
    }
}
