pub mod chat;
pub mod stream;

pub use chat::{ Conversation, Message, Role };
pub use stream::StreamEvent;
