use serde::{ Serialize, Deserialize };
use super::chat::Message;

/// One line of the send-message response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StreamEvent {
    #[serde(rename = "message")] Message(Message),
    #[serde(rename = "error")] Error(String),
}
