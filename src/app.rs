use chrono::Utc;
use log::{ debug, error, info, warn };
use std::error::Error;
use std::io::{ self, Write };
use std::sync::Arc;
use termimad::crossterm::cursor::MoveTo;
use termimad::crossterm::queue;
use termimad::crossterm::terminal::{ Clear, ClearType };
use tokio::io::{ AsyncBufReadExt, BufReader };

use crate::api::ChatApi;
use crate::config::ClientConfig;
use crate::session::{ ChatSession, Notice, NoticeLevel, SessionError };
use crate::ui::{ Command, Frame, InputEvent, InputLine, Renderer, ThemeController };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Terminal front end: reads stdin, drives the session and redraws.
pub struct App {
    session: ChatSession,
    theme: ThemeController,
    renderer: Renderer,
    input: InputLine,
    notices: Vec<Notice>,
    sidebar_open: bool,
    show_help: bool,
}

impl App {
    pub fn new(api: Arc<dyn ChatApi>, config: &ClientConfig, theme: ThemeController) -> Self {
        let renderer = Renderer::new(theme.theme(), config.render_width);
        Self {
            session: ChatSession::new(api, config),
            theme,
            renderer,
            input: InputLine::new(),
            notices: Vec::new(),
            sidebar_open: true,
            show_help: false,
        }
    }

    pub async fn run(mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.session.start().await;
        self.redraw()?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("Input closed, exiting");
                        break;
                    };
                    if self.handle_line(&line).await == Flow::Quit {
                        break;
                    }
                    if self.input.has_pending() {
                        continue;
                    }
                }
                Some(event) = self.session.next_event() => {
                    self.session.apply(event).await;
                }
            }
            self.redraw()?;
        }
        Ok(())
    }

    /// Feeds one line of terminal input.
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        let text = match self.input.feed(line) {
            InputEvent::Submitted(text) => text,
            InputEvent::Pending | InputEvent::Blank => {
                return Flow::Continue;
            }
        };
        match Command::parse(&text) {
            Ok(command) => self.execute(command).await,
            Err(e) => {
                self.notify(NoticeLevel::Warning, e.to_string());
                Flow::Continue
            }
        }
    }

    pub async fn execute(&mut self, command: Command) -> Flow {
        debug!("Command: {:?}", command);
        self.show_help = false;

        match command {
            Command::Quit => {
                return Flow::Quit;
            }
            Command::Help => {
                self.show_help = true;
            }
            Command::ToggleSidebar => {
                self.sidebar_open = !self.sidebar_open;
            }
            Command::New => {
                if self.session.new_conversation().await.is_ok() {
                    self.sidebar_open = false;
                }
            }
            Command::Open(reference) => {
                if let Some(id) = self.resolve(&reference) {
                    if let Err(e) = self.session.select_conversation(&id).await {
                        warn!("Could not open {}: {}", id, e);
                    }
                    self.sidebar_open = false;
                }
            }
            Command::Delete(reference) => {
                if let Some(id) = self.resolve(&reference) {
                    // failures are reported as session notices
                    if let Err(e) = self.session.delete_conversation(&id).await {
                        debug!("Delete of {} not applied: {}", id, e);
                    }
                }
            }
            Command::ToggleTheme => self.toggle_theme(),
            Command::Say(text) => {
                if self.input.is_disabled() {
                    self.notify(NoticeLevel::Warning, "Wait for the current reply to finish");
                } else {
                    match self.session.send_message(&text).await {
                        Ok(()) | Err(SessionError::NoActiveConversation) => {}
                        Err(e) => debug!("Send not started: {}", e),
                    }
                }
            }
        }
        self.input.set_disabled(self.session.is_sending());
        Flow::Continue
    }

    fn resolve(&mut self, reference: &str) -> Option<String> {
        let id = self.session
            .conversations()
            .resolve(reference)
            .map(|conv| conv.id.clone());
        if id.is_none() {
            self.notify(NoticeLevel::Warning, format!("No conversation matches '{}'", reference));
        }
        id
    }

    fn toggle_theme(&mut self) {
        let result = self.theme.toggle();
        let theme = self.theme.theme();
        self.renderer.set_theme(theme);
        match result {
            Ok(_) => self.notify(NoticeLevel::Info, format!("Switched to {} mode", theme)),
            Err(e) => {
                error!("Error saving theme: {}", e);
                self.notify(NoticeLevel::Warning, format!("Switched to {} mode, but it could not be saved", theme));
            }
        }
    }

    fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notices.push(Notice::new(level, text));
    }

    /// Draws the current state; notices are shown once and then dropped.
    pub fn render(&mut self) -> String {
        self.input.set_disabled(self.session.is_sending());
        self.notices.extend(self.session.take_notices());
        let notices = std::mem::take(&mut self.notices);
        self.renderer.frame(
            &(Frame {
                conversations: self.session.conversations(),
                thread: self.session.thread(),
                notices: &notices,
                sidebar_open: self.sidebar_open,
                show_help: self.show_help,
                now: Utc::now(),
            })
        )
    }

    fn redraw(&mut self) -> io::Result<()> {
        let frame = self.render();
        let mut stdout = io::stdout();
        queue!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        stdout.write_all(frame.as_bytes())?;
        stdout.flush()
    }
}
