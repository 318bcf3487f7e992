pub mod conversations;
pub mod thread;

pub use conversations::ConversationStore;
pub use thread::{ AppendOutcome, MessageThread, ThreadError };
