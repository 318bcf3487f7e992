pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::models::{ Conversation, Message };
use self::http::HttpChatApi;

/// Raw response body of a send, chunked however the transport delivers it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid backend url '{url}': {reason}")] InvalidUrl {
        url: String,
        reason: String,
    },

    #[error("{method} {url} failed: {source}")] Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned {status}")] Status {
        method: &'static str,
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode response from {url}: {source}")] Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no data received for {0:?}")] Timeout(Duration),

    #[error("response stream failed: {0}")] Stream(#[source] Box<dyn StdError + Send + Sync>),
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Backend liveness probe; returns the server's greeting.
    async fn health(&self) -> Result<String, ApiError>;

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    async fn create_conversation(&self, title: &str) -> Result<Conversation, ApiError>;

    async fn delete_conversation(&self, id: &str) -> Result<(), ApiError>;

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError>;

    /// Posts a user message and hands back the still-open NDJSON body.
    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str
    ) -> Result<ByteStream, ApiError>;
}

pub fn new_client(config: &ClientConfig) -> Result<Arc<dyn ChatApi>, ApiError> {
    let client = HttpChatApi::new(&config.backend_url, config.request_timeout)?;
    Ok(Arc::new(client))
}
