use log::{ debug, info };

use crate::api::{ ApiError, ChatApi };
use crate::models::Conversation;

/// Sidebar state: the server-ordered conversation list and the active id.
///
/// Creation and removal only touch local state after the server confirmed
/// them, so a failed call never leaves the list out of step with the backend.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active_id: Option<String>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Looks a conversation up by 1-based list position, exact id, or unique id prefix.
    pub fn resolve(&self, reference: &str) -> Option<&Conversation> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if let Ok(position) = reference.parse::<usize>() {
            if let Some(conv) = position.checked_sub(1).and_then(|i| self.conversations.get(i)) {
                return Some(conv);
            }
        }
        if let Some(conv) = self.get(reference) {
            return Some(conv);
        }
        let mut matches = self.conversations.iter().filter(|c| c.id.starts_with(reference));
        match (matches.next(), matches.next()) {
            (Some(conv), None) => Some(conv),
            _ => None,
        }
    }

    /// Replaces the list with the server's view.
    ///
    /// With nothing active the first entry becomes active; an active id that
    /// vanished from the list falls back the same way.
    pub fn replace(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
        let still_present = self.active_id.as_deref().map_or(false, |id| self.get(id).is_some());
        if !still_present {
            self.active_id = self.conversations.first().map(|c| c.id.clone());
        }
    }

    /// Returns false (and changes nothing) for ids not in the list.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            debug!("Ignoring selection of unknown conversation {}", id);
            return false;
        }
        self.active_id = Some(id.to_string());
        true
    }

    pub async fn refresh(&mut self, api: &dyn ChatApi) -> Result<(), ApiError> {
        let conversations = api.list_conversations().await?;
        debug!("Loaded {} conversations", conversations.len());
        self.replace(conversations);
        Ok(())
    }

    /// Creates a conversation on the server, then prepends and activates it.
    pub async fn create(&mut self, api: &dyn ChatApi, title: &str) -> Result<&Conversation, ApiError> {
        let created = api.create_conversation(title).await?;
        info!("Created conversation {} ({:?})", created.id, created.title);
        self.conversations.retain(|c| c.id != created.id);
        self.active_id = Some(created.id.clone());
        self.conversations.insert(0, created);
        Ok(&self.conversations[0])
    }

    /// Deletes on the server; the local entry goes only once that succeeded.
    pub async fn remove(&mut self, api: &dyn ChatApi, id: &str) -> Result<(), ApiError> {
        api.delete_conversation(id).await?;
        info!("Deleted conversation {}", id);
        self.conversations.retain(|c| c.id != id);
        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.conversations.first().map(|c| c.id.clone());
        }
        Ok(())
    }
}
