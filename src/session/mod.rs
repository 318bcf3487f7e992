use futures::StreamExt;
use log::{ debug, error, info, warn };
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{ ApiError, ChatApi };
use crate::config::ClientConfig;
use crate::models::StreamEvent;
use crate::store::{ AppendOutcome, ConversationStore, MessageThread, ThreadError };
use crate::stream::decode_events;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no conversation is open")] NoActiveConversation,
    #[error("message is empty")] EmptyMessage,
    #[error("a reply is still streaming for this conversation")] SendInFlight,
    #[error("unknown conversation '{0}'")] UnknownConversation(String),
    #[error(transparent)] Api(#[from] ApiError),
}

impl From<ThreadError> for SessionError {
    fn from(err: ThreadError) -> Self {
        match err {
            ThreadError::NoConversation => SessionError::NoActiveConversation,
            ThreadError::SendInFlight => SessionError::SendInFlight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self { level, text: text.into() }
    }
}

/// Output of a streaming send, delivered back to the session loop.
#[derive(Debug)]
pub enum SessionEvent {
    Stream {
        generation: u64,
        event: StreamEvent,
    },
    StreamFailed {
        generation: u64,
        error: ApiError,
    },
    StreamEnded {
        generation: u64,
    },
}

impl SessionEvent {
    fn generation(&self) -> u64 {
        match self {
            SessionEvent::Stream { generation, .. }
            | SessionEvent::StreamFailed { generation, .. }
            | SessionEvent::StreamEnded { generation } => *generation,
        }
    }
}

struct InFlight {
    generation: u64,
    conversation_id: String,
    task: JoinHandle<()>,
}

/// Conversation list, open thread and the in-flight send.
///
/// All mutation happens through `&mut self` on the loop that owns the
/// session. Streamed replies are read on a spawned task and come back as
/// `SessionEvent`s, which the loop hands to `apply`.
pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    conversations: ConversationStore,
    thread: MessageThread,
    notices: Vec<Notice>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    in_flight: Option<InFlight>,
    next_generation: u64,
    read_timeout: Duration,
    default_title: String,
}

impl ChatSession {
    pub fn new(api: Arc<dyn ChatApi>, config: &ClientConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            conversations: ConversationStore::new(),
            thread: MessageThread::new(),
            notices: Vec::new(),
            events_tx,
            events_rx,
            in_flight: None,
            next_generation: 0,
            read_timeout: config.stream_read_timeout,
            default_title: config.default_title.clone(),
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn thread(&self) -> &MessageThread {
        &self.thread
    }

    pub fn is_sending(&self) -> bool {
        self.thread.is_sending()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notices.push(Notice::new(level, text));
    }

    /// Initial load: conversation list, then the active thread.
    pub async fn start(&mut self) {
        self.refresh_conversations().await;
    }

    /// Re-reads the list from the server. Errors are logged and the old list kept.
    pub async fn refresh_conversations(&mut self) {
        if let Err(e) = self.conversations.refresh(self.api.as_ref()).await {
            error!("Error loading conversations: {}", e);
        }
        self.sync_thread().await;
    }

    // Brings the thread in line with the active conversation.
    async fn sync_thread(&mut self) {
        let active = self.conversations.active_id().map(str::to_string);
        if active.as_deref() == self.thread.conversation_id() {
            return;
        }
        self.abandon_stream();

        match active {
            Some(id) => {
                if let Err(e) = self.thread.load(self.api.as_ref(), &id).await {
                    error!("Error loading messages for {}: {}", id, e);
                    self.notify(NoticeLevel::Error, "Failed to load messages");
                }
            }
            None => self.thread.clear(),
        }
    }

    pub async fn new_conversation(&mut self) -> Result<(), SessionError> {
        let title = self.default_title.clone();
        let created = self.conversations
            .create(self.api.as_ref(), &title).await
            .map(|conv| conv.id.clone());
        match created {
            Ok(id) => debug!("Opened new conversation {}", id),
            Err(e) => {
                error!("Error creating conversation: {}", e);
                self.notify(NoticeLevel::Error, "Failed to create conversation");
                return Err(e.into());
            }
        }
        self.sync_thread().await;
        Ok(())
    }

    pub async fn select_conversation(&mut self, id: &str) -> Result<(), SessionError> {
        if !self.conversations.select(id) {
            return Err(SessionError::UnknownConversation(id.to_string()));
        }
        self.sync_thread().await;
        Ok(())
    }

    /// Deletes on the server. A failure re-syncs the list from the server
    /// instead of trusting local state.
    pub async fn delete_conversation(&mut self, id: &str) -> Result<(), SessionError> {
        if let Err(e) = self.conversations.remove(self.api.as_ref(), id).await {
            error!("Error deleting conversation {}: {}", id, e);
            self.notify(NoticeLevel::Error, "Failed to delete conversation");
            self.refresh_conversations().await;
            return Err(e.into());
        }
        self.sync_thread().await;
        Ok(())
    }

    /// Appends the user message optimistically and starts streaming the reply.
    ///
    /// Rejected while a reply for the open conversation is still streaming.
    pub async fn send_message(&mut self, content: &str) -> Result<(), SessionError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let conversation_id = match self.thread.conversation_id() {
            Some(id) => id.to_string(),
            None => {
                self.notify(NoticeLevel::Warning, "Please create a conversation first");
                return Err(SessionError::NoActiveConversation);
            }
        };
        self.thread.begin_send()?;
        let local_id = self.thread.push_optimistic(content).id.clone();

        let body = match self.api.send_message(&conversation_id, content).await {
            Ok(body) => body,
            Err(e) => {
                error!("Error sending message: {}", e);
                self.thread.discard_local(&local_id);
                self.thread.end_send();
                self.notify(NoticeLevel::Error, "Failed to send message");
                return Err(e.into());
            }
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        let tx = self.events_tx.clone();
        let read_timeout = self.read_timeout;

        let task = tokio::spawn(async move {
            let mut events = decode_events(body, read_timeout);
            while let Some(item) = events.next().await {
                let forwarded = match item {
                    Ok(event) => tx.send(SessionEvent::Stream { generation, event }),
                    Err(error) => {
                        let _ = tx.send(SessionEvent::StreamFailed { generation, error });
                        return;
                    }
                };
                if forwarded.is_err() {
                    return;
                }
            }
            let _ = tx.send(SessionEvent::StreamEnded { generation });
        });

        info!("Streaming reply for {} (generation {})", conversation_id, generation);
        self.in_flight = Some(InFlight { generation, conversation_id, task });
        Ok(())
    }

    /// Waits for the next event from an in-flight send.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    pub async fn apply(&mut self, event: SessionEvent) {
        let current = self.in_flight.as_ref().map(|f| f.generation);
        if current != Some(event.generation()) {
            debug!("Dropping event from abandoned stream {}", event.generation());
            return;
        }

        match event {
            SessionEvent::Stream { event: StreamEvent::Message(message), .. } => {
                let id = message.id.clone();
                if self.thread.append(message) == AppendOutcome::Ignored {
                    return;
                }
                debug!("Received message {}", id);
                // updated_at (and possibly the title) changed server-side
                if let Err(e) = self.conversations.refresh(self.api.as_ref()).await {
                    error!("Error loading conversations: {}", e);
                }
                self.sync_thread().await;
            }
            SessionEvent::Stream { event: StreamEvent::Error(text), .. } => {
                warn!("Backend reported an error: {}", text);
                self.notify(NoticeLevel::Warning, format!("AI Error: {}", text));
            }
            SessionEvent::StreamFailed { error, .. } => {
                error!("Error reading reply: {}", error);
                self.notify(NoticeLevel::Error, "Failed to send message");
                self.finish_stream();
            }
            SessionEvent::StreamEnded { .. } => {
                self.finish_stream();
            }
        }
    }

    fn finish_stream(&mut self) {
        if let Some(done) = self.in_flight.take() {
            debug!("Reply stream for {} finished", done.conversation_id);
        }
        self.thread.end_send();
    }

    // Stops reading the current reply, if any, without waiting for it.
    fn abandon_stream(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            info!("Abandoning reply stream for {}", in_flight.conversation_id);
            in_flight.task.abort();
        }
        self.thread.end_send();
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
        }
    }
}
