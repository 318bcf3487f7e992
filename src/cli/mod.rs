use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Root URL of the chat backend; the client talks to its `/api` routes.
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:8000")]
    pub backend_url: String,

    /// Timeout in seconds for conversation/message requests and for the head of a send.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Longest pause in seconds tolerated between two chunks of a streamed reply.
    #[arg(long, env = "STREAM_READ_TIMEOUT_SECS", default_value = "120")]
    pub stream_read_timeout_secs: u64,

    // --- Client Args ---
    /// Title given to conversations created from the client.
    #[arg(long, env = "DEFAULT_CONVERSATION_TITLE", default_value = "New Chat")]
    pub default_title: String,

    /// Path of the preferences file (theme). Defaults to the user config directory.
    #[arg(long, env = "PREFERENCES_PATH")]
    pub preferences_path: Option<String>,

    /// Column width used when wrapping rendered messages.
    #[arg(long, env = "RENDER_WIDTH", default_value = "80")]
    pub render_width: usize,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
