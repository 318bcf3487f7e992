use log::{ debug, warn };
use thiserror::Error;

use crate::api::{ ApiError, ChatApi };
use crate::models::{ Message, Role };

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadError {
    #[error("no conversation is open")] NoConversation,
    #[error("a reply is still streaming for this conversation")] SendInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// The server's copy of a user message took the place of the optimistic one.
    Reconciled,
    /// The message belongs to another conversation.
    Ignored,
}

/// Messages of the open conversation, in arrival order.
#[derive(Debug, Default)]
pub struct MessageThread {
    conversation_id: Option<String>,
    messages: Vec<Message>,
    sending: bool,
}

impl MessageThread {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Switches to `conversation_id`, discarding the previous thread, then loads history.
    ///
    /// On failure the thread stays empty under the new id.
    pub async fn load(&mut self, api: &dyn ChatApi, conversation_id: &str) -> Result<(), ApiError> {
        self.conversation_id = Some(conversation_id.to_string());
        self.messages.clear();
        self.sending = false;

        let history = api.list_messages(conversation_id).await?;
        debug!("Loaded {} messages for {}", history.len(), conversation_id);
        self.messages = history;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
        self.sending = false;
    }

    pub fn begin_send(&mut self) -> Result<(), ThreadError> {
        if self.conversation_id.is_none() {
            return Err(ThreadError::NoConversation);
        }
        if self.sending {
            return Err(ThreadError::SendInFlight);
        }
        self.sending = true;
        Ok(())
    }

    pub fn end_send(&mut self) {
        self.sending = false;
    }

    pub fn push_optimistic(&mut self, content: &str) -> &Message {
        self.messages.push(Message::local_user(self.conversation_id.clone(), content));
        &self.messages[self.messages.len() - 1]
    }

    /// Takes back an optimistic message whose send never reached the server.
    pub fn discard_local(&mut self, id: &str) -> bool {
        match self.messages.iter().position(|m| m.is_local() && m.id == id) {
            Some(index) => {
                self.messages.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn append(&mut self, message: Message) -> AppendOutcome {
        if let (Some(theirs), Some(ours)) = (message.conversation_id.as_deref(), self.conversation_id.as_deref()) {
            if theirs != ours {
                warn!("Dropping message {} for conversation {} while {} is open", message.id, theirs, ours);
                return AppendOutcome::Ignored;
            }
        }

        if message.role == Role::User {
            let placeholder = self.messages
                .iter()
                .position(|m| m.is_local() && m.role == Role::User && m.content == message.content);
            if let Some(index) = placeholder {
                self.messages[index] = message;
                return AppendOutcome::Reconciled;
            }
        }

        self.messages.push(message);
        AppendOutcome::Appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ assistant, conversation, user, FakeApi };

    #[tokio::test]
    async fn switching_replaces_the_thread() {
        let api = FakeApi::with_conversations(vec![conversation("a"), conversation("b")]);
        api.set_messages("a", vec![user("a", "a1", "hi"), assistant("a", "a2", "hello")]);
        api.set_messages("b", vec![assistant("b", "b1", "other")]);

        let mut thread = MessageThread::new();
        thread.load(&api, "a").await.unwrap();
        assert_eq!(thread.messages().len(), 2);

        thread.load(&api, "b").await.unwrap();
        let ids: Vec<_> = thread.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b1"]);
        assert_eq!(thread.conversation_id(), Some("b"));
    }

    #[tokio::test]
    async fn failed_load_leaves_an_empty_thread_for_the_new_id() {
        let api = FakeApi::with_conversations(vec![conversation("a"), conversation("b")]);
        api.set_messages("a", vec![user("a", "a1", "hi")]);

        let mut thread = MessageThread::new();
        thread.load(&api, "a").await.unwrap();
        api.fail_lists(true);

        assert!(thread.load(&api, "b").await.is_err());
        assert!(thread.messages().is_empty());
        assert_eq!(thread.conversation_id(), Some("b"));
    }

    #[test]
    fn only_one_send_at_a_time() {
        let mut thread = MessageThread::new();
        assert_eq!(thread.begin_send(), Err(ThreadError::NoConversation));

        thread.conversation_id = Some("a".into());
        thread.begin_send().unwrap();
        assert_eq!(thread.begin_send(), Err(ThreadError::SendInFlight));
        thread.end_send();
        assert!(thread.begin_send().is_ok());
    }

    #[test]
    fn appends_in_arrival_order_and_reconciles_echoes() {
        let mut thread = MessageThread::new();
        thread.conversation_id = Some("a".into());

        let local_id = thread.push_optimistic("what time is it?").id.clone();
        assert_eq!(thread.append(assistant("a", "r1", "noon")), AppendOutcome::Appended);
        assert_eq!(thread.append(user("a", "u1", "what time is it?")), AppendOutcome::Reconciled);

        let ids: Vec<_> = thread.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "r1"]);
        assert!(thread.messages().iter().all(|m| m.id != local_id));

        assert_eq!(thread.append(user("a", "u2", "unmatched")), AppendOutcome::Appended);
        assert_eq!(thread.messages().len(), 3);
    }

    #[test]
    fn discard_local_only_removes_placeholders() {
        let mut thread = MessageThread::new();
        thread.conversation_id = Some("a".into());
        thread.append(user("a", "u1", "kept"));
        let local_id = thread.push_optimistic("never sent").id.clone();

        assert!(!thread.discard_local("u1"));
        assert!(thread.discard_local(&local_id));
        assert!(!thread.discard_local(&local_id));
        let ids: Vec<_> = thread.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["u1"]);
    }

    #[test]
    fn messages_for_other_conversations_are_ignored() {
        let mut thread = MessageThread::new();
        thread.conversation_id = Some("a".into());
        assert_eq!(thread.append(assistant("b", "x", "stray")), AppendOutcome::Ignored);
        assert!(thread.messages().is_empty());
    }
}
