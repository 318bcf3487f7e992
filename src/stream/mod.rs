pub mod decoder;
pub mod reader;

pub use decoder::{ DecodeError, LineDecoder };
pub use reader::{ decode_events, EventStream };
