use chrono::{ DateTime, Local, Utc };
use termimad::crossterm::style::{ style, Stylize };
use termimad::MadSkin;

use super::theme::{ Palette, Theme };
use crate::models::{ Message, Role };
use crate::session::{ Notice, NoticeLevel };
use crate::store::{ ConversationStore, MessageThread };

const APP_TITLE: &str = "E1 Chat";
const ASSISTANT_NAME: &str = "E1 Assistant";

/// Everything one screen is drawn from.
pub struct Frame<'a> {
    pub conversations: &'a ConversationStore,
    pub thread: &'a MessageThread,
    pub notices: &'a [Notice],
    pub sidebar_open: bool,
    pub show_help: bool,
    pub now: DateTime<Utc>,
}

/// "Today", "Yesterday", "N days ago", then the calendar date.
pub fn relative_date(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match (now - timestamp).num_days().abs() {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        days if days < 7 => format!("{} days ago", days),
        _ => timestamp.date_naive().format("%Y-%m-%d").to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() && max_chars > 0 {
        let mut head: String = head.chars().take(max_chars - 1).collect();
        head.push('…');
        head
    } else {
        head
    }
}

/// Pure state-to-text rendering. Holds the theme's palette and markdown skin.
pub struct Renderer {
    theme: Theme,
    palette: Palette,
    skin: MadSkin,
    width: usize,
}

impl Renderer {
    pub fn new(theme: Theme, width: usize) -> Self {
        Self {
            theme,
            palette: theme.palette(),
            skin: theme.markdown_skin(),
            width,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if theme != self.theme {
            *self = Self::new(theme, self.width);
        }
    }

    pub fn sidebar(&self, store: &ConversationStore, now: DateTime<Utc>) -> String {
        let p = &self.palette;
        let mut lines = vec![
            style(APP_TITLE).with(p.accent).bold().to_string(),
            format!("  {}  New Chat", style("/new").with(p.accent))
        ];

        if store.is_empty() {
            lines.push(style("  No conversations yet").with(p.muted).to_string());
        }

        let title_width = self.width.saturating_sub(24).max(8);
        for (index, conv) in store.conversations().iter().enumerate() {
            let active = store.active_id() == Some(conv.id.as_str());
            let title = truncate(&conv.title, title_width);
            let when = relative_date(conv.updated_at, now);
            let marker = if active { "▸" } else { " " };
            let title = if active {
                style(title).with(p.accent).bold().to_string()
            } else {
                style(title).with(p.text).to_string()
            };
            lines.push(
                format!(
                    "{} {:>2}. {}  {}",
                    style(marker).with(p.accent),
                    index + 1,
                    title,
                    style(when).with(p.muted)
                )
            );
        }

        let toggle = match self.theme {
            Theme::Light => "Dark Mode",
            Theme::Dark => "Light Mode",
        };
        lines.push(format!("  {}  {}", style("/theme").with(p.accent), toggle));
        lines.join("\n")
    }

    pub fn message(&self, message: &Message) -> String {
        let p = &self.palette;
        let time = message.timestamp.with_timezone(&Local).format("%H:%M");
        match message.role {
            Role::User => {
                let label = style("You").with(p.accent).bold();
                let body = message.content
                    .lines()
                    .map(|line| format!("  {}", style(line).with(p.text)))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{} {}\n{}", label, style(time).with(p.muted), body)
            }
            Role::Assistant => {
                let label = style(format!("✦ {}", ASSISTANT_NAME)).with(p.assistant).bold();
                let body = self.skin.text(&message.content, Some(self.width)).to_string();
                format!("{} {}\n{}", label, style(time).with(p.muted), body.trim_end())
            }
        }
    }

    pub fn thread(&self, thread: &MessageThread, title: Option<&str>) -> String {
        let p = &self.palette;
        let mut blocks = Vec::new();

        let mut header = style(format!("✦ {}", ASSISTANT_NAME)).with(p.assistant).bold().to_string();
        if let Some(title) = title {
            header.push_str(&format!(" · {}", style(truncate(title, self.width / 2)).with(p.muted)));
        }
        blocks.push(header);
        blocks.push(style("─".repeat(self.width)).with(p.muted).to_string());

        if thread.messages().is_empty() && !thread.is_sending() {
            blocks.push(style("Say hello to start the conversation.").with(p.muted).to_string());
        }
        for message in thread.messages() {
            blocks.push(self.message(message));
        }
        if thread.is_sending() {
            blocks.push(
                style(format!("✦ {} is typing…", ASSISTANT_NAME)).with(p.assistant).italic().to_string()
            );
        }
        blocks.join("\n\n")
    }

    pub fn welcome(&self) -> String {
        let p = &self.palette;
        [
            style(format!("Welcome to {}", APP_TITLE)).with(p.accent).bold().to_string(),
            style("Start a conversation by creating a new chat").with(p.muted).to_string(),
            format!("Type {} to begin, or {} for all commands.", style("/new").with(p.accent), style("/help").with(p.accent)),
        ].join("\n")
    }

    pub fn notice(&self, notice: &Notice) -> String {
        let p = &self.palette;
        match notice.level {
            NoticeLevel::Info => style(format!("• {}", notice.text)).with(p.muted).to_string(),
            NoticeLevel::Warning => style(format!("! {}", notice.text)).with(p.warning).to_string(),
            NoticeLevel::Error => style(format!("✗ {}", notice.text)).with(p.danger).bold().to_string(),
        }
    }

    pub fn input_hint(&self, disabled: bool) -> String {
        let p = &self.palette;
        if disabled {
            style("Waiting for the reply…").with(p.muted).italic().to_string()
        } else {
            style("Press Enter to send, end a line with \\ to continue on the next line").with(p.muted).to_string()
        }
    }

    pub fn help(&self) -> String {
        let p = &self.palette;
        let commands = [
            ("/new", "start a new conversation"),
            ("/list", "show or hide the conversation list"),
            ("/open <n|id>", "open a conversation"),
            ("/delete <n|id>", "delete a conversation"),
            ("/theme", "switch between light and dark"),
            ("/quit", "exit"),
        ];
        commands
            .iter()
            .map(|(cmd, what)| format!("  {} {}", style(format!("{:<16}", cmd)).with(p.accent), style(what).with(p.muted)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn frame(&self, frame: &Frame<'_>) -> String {
        let mut sections = Vec::new();

        if frame.sidebar_open {
            sections.push(self.sidebar(frame.conversations, frame.now));
        }
        if frame.show_help {
            sections.push(self.help());
        }
        match frame.conversations.active() {
            Some(active) if frame.thread.conversation_id() == Some(active.id.as_str()) => {
                sections.push(self.thread(frame.thread, Some(&active.title)));
            }
            _ => sections.push(self.welcome()),
        }
        if !frame.notices.is_empty() {
            sections.push(
                frame.notices
                    .iter()
                    .map(|n| self.notice(n))
                    .collect::<Vec<_>>()
                    .join("\n")
            );
        }
        sections.push(self.input_hint(frame.thread.is_sending()));

        let rule = style("─".repeat(self.width)).with(self.palette.muted).to_string();
        format!("{}\n", sections.join(&format!("\n{}\n", rule)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ assistant, conversation, user, FakeApi };
    use chrono::{ Duration, TimeZone };

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn relative_date_buckets() {
        let now = at(20, 12);
        assert_eq!(relative_date(at(20, 1), now), "Today");
        assert_eq!(relative_date(now - Duration::hours(23), now), "Today");
        assert_eq!(relative_date(at(19, 11), now), "Yesterday");
        assert_eq!(relative_date(at(16, 12), now), "4 days ago");
        assert_eq!(relative_date(at(13, 12), now), "2025-03-13");
        // clock skew: slightly in the future still counts as today
        assert_eq!(relative_date(now + Duration::minutes(5), now), "Today");
    }

    #[test]
    fn truncates_long_titles() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly ten", 11), "exactly ten");
        assert_eq!(truncate("this is far too long", 8), "this is…");
    }

    #[test]
    fn sidebar_lists_conversations_and_theme_toggle() {
        let mut store = ConversationStore::new();
        let mut first = conversation("a");
        first.title = "Rust questions".to_string();
        store.replace(vec![first, conversation("b")]);

        let renderer = Renderer::new(Theme::Light, 80);
        let out = renderer.sidebar(&store, Utc.with_ymd_and_hms(2025, 1, 1, 18, 0, 0).unwrap());
        assert!(out.contains("E1 Chat"));
        assert!(out.contains("Rust questions"));
        assert!(out.contains("title b"));
        assert!(out.contains("Today"));
        assert!(out.contains("▸"));
        assert!(out.contains("Dark Mode"));

        let dark = Renderer::new(Theme::Dark, 80).sidebar(&ConversationStore::new(), Utc::now());
        assert!(dark.contains("No conversations yet"));
        assert!(dark.contains("Light Mode"));
    }

    #[test]
    fn user_text_is_literal_and_assistant_text_is_markdown() {
        let renderer = Renderer::new(Theme::Light, 60);

        let mine = renderer.message(&user("a", "u", "keep **stars**"));
        assert!(mine.contains("**stars**"));

        let reply = renderer.message(&assistant("a", "r", "some **bold** words"));
        assert!(reply.contains("bold"));
        assert!(!reply.contains("**"));
        assert!(reply.contains("E1 Assistant"));
    }

    #[tokio::test]
    async fn frame_shows_welcome_thread_and_typing_indicator() {
        let renderer = Renderer::new(Theme::Dark, 80);
        let empty_store = ConversationStore::new();
        let empty_thread = MessageThread::new();
        let welcome = renderer.frame(&(Frame {
            conversations: &empty_store,
            thread: &empty_thread,
            notices: &[],
            sidebar_open: false,
            show_help: false,
            now: Utc::now(),
        }));
        assert!(welcome.contains("Welcome to E1 Chat"));

        let api = FakeApi::with_conversations(vec![conversation("a")]);
        api.set_messages("a", vec![user("a", "u1", "ping")]);
        let mut store = ConversationStore::new();
        store.refresh(&api).await.unwrap();
        let mut thread = MessageThread::new();
        thread.load(&api, "a").await.unwrap();
        thread.begin_send().unwrap();

        let notices = [Notice::new(NoticeLevel::Warning, "AI Error: boom")];
        let out = renderer.frame(&(Frame {
            conversations: &store,
            thread: &thread,
            notices: &notices,
            sidebar_open: true,
            show_help: true,
            now: Utc::now(),
        }));
        assert!(out.contains("ping"));
        assert!(out.contains("is typing"));
        assert!(out.contains("AI Error: boom"));
        assert!(out.contains("Waiting for the reply"));
        assert!(out.contains("/delete"));
        assert!(!out.contains("Welcome to E1 Chat"));
    }
}
