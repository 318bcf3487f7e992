use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use reqwest::{ Client as HttpClient, Response };
use serde::de::DeserializeOwned;
use serde::{ Deserialize, Serialize };
use std::time::Duration;
use url::Url;

use super::{ ApiError, ByteStream, ChatApi };
use crate::models::{ Conversation, Message };

#[derive(Debug, Clone)]
pub struct HttpChatApi {
    http: HttpClient,
    api_base: Url,
    request_timeout: Duration,
}

#[derive(Serialize)]
struct CreateConversationRequest<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct HealthResponse {
    message: String,
}

impl HttpChatApi {
    /// `backend_url` is the server root; every endpoint lives under its `/api` path.
    pub fn new(backend_url: &str, request_timeout: Duration) -> Result<Self, ApiError> {
        let invalid = |reason: String| ApiError::InvalidUrl {
            url: backend_url.to_string(),
            reason,
        };

        let mut api_base = Url::parse(backend_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(api_base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", api_base.scheme())));
        }
        api_base
            .path_segments_mut()
            .map_err(|_| invalid("url cannot be a base".to_string()))?
            .pop_if_empty()
            .push("api");
        api_base.set_query(None);
        api_base.set_fragment(None);

        let http = HttpClient::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            http,
            api_base,
            request_timeout,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl {
                url: self.api_base.to_string(),
                reason: "url cannot be a base".to_string(),
            })?
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!("GET {}", url);
        let resp = self.http
            .get(url.clone())
            .timeout(self.request_timeout)
            .send().await
            .map_err(|source| ApiError::Transport { method: "GET", url: url.to_string(), source })?;
        let resp = check_status("GET", &url, resp)?;
        resp.json::<T>().await.map_err(|source| ApiError::Decode { url: url.to_string(), source })
    }
}

fn check_status(method: &'static str, url: &Url, resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ApiError::Status { method, url: url.to_string(), status });
    }
    Ok(resp)
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn health(&self) -> Result<String, ApiError> {
        let url = self.endpoint(&[""])?;
        let body: HealthResponse = self.get_json(url).await?;
        Ok(body.message)
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let url = self.endpoint(&["conversations"])?;
        self.get_json(url).await
    }

    async fn create_conversation(&self, title: &str) -> Result<Conversation, ApiError> {
        let url = self.endpoint(&["conversations"])?;
        debug!("POST {}", url);
        let resp = self.http
            .post(url.clone())
            .timeout(self.request_timeout)
            .json(&(CreateConversationRequest { title }))
            .send().await
            .map_err(|source| ApiError::Transport { method: "POST", url: url.to_string(), source })?;
        let resp = check_status("POST", &url, resp)?;
        resp.json::<Conversation>().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["conversations", id])?;
        debug!("DELETE {}", url);
        let resp = self.http
            .delete(url.clone())
            .timeout(self.request_timeout)
            .send().await
            .map_err(|source| ApiError::Transport { method: "DELETE", url: url.to_string(), source })?;
        check_status("DELETE", &url, resp)?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        let url = self.endpoint(&["conversations", conversation_id, "messages"])?;
        self.get_json(url).await
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str
    ) -> Result<ByteStream, ApiError> {
        let url = self.endpoint(&["conversations", conversation_id, "messages"])?;
        debug!("POST {} (streaming)", url);

        // No whole-request timeout here: the body is long-lived and the decoder
        // bounds each read instead. Only waiting for the response head is capped.
        let request = self.http.post(url.clone()).json(&(SendMessageRequest { content })).send();
        let resp = tokio::time::timeout(self.request_timeout, request).await
            .map_err(|_| ApiError::Timeout(self.request_timeout))?
            .map_err(|source| ApiError::Transport { method: "POST", url: url.to_string(), source })?;
        let resp = check_status("POST", &url, resp)?;

        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ApiError::Stream(Box::new(e))));
        Ok(Box::pin(body))
    }
}
