use log::{ info, warn };
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;
use termimad::crossterm::style::Color;
use termimad::MadSkin;

use super::preferences::{ PreferenceError, PreferenceStore };

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseThemeError {
    value: String,
}

impl fmt::Display for ParseThemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid theme: '{}'", self.value)
    }
}

impl std::error::Error for ParseThemeError {}

impl FromStr for Theme {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(ParseThemeError { value: s.to_string() }),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Light =>
                Palette {
                    accent: rgb(0x4f, 0x46, 0xe5),
                    text: rgb(0x18, 0x18, 0x1b),
                    muted: rgb(0x71, 0x71, 0x7a),
                    assistant: rgb(0x8b, 0x5c, 0xf6),
                    warning: rgb(0xb4, 0x53, 0x09),
                    danger: rgb(0xef, 0x44, 0x44),
                },
            Theme::Dark =>
                Palette {
                    accent: rgb(0x81, 0x8c, 0xf8),
                    text: rgb(0xfa, 0xfa, 0xfa),
                    muted: rgb(0xa1, 0xa1, 0xaa),
                    assistant: rgb(0xa7, 0x8b, 0xfa),
                    warning: rgb(0xfb, 0xbf, 0x24),
                    danger: rgb(0xf8, 0x71, 0x71),
                },
        }
    }

    /// Markdown skin for assistant replies.
    pub fn markdown_skin(self) -> MadSkin {
        let palette = self.palette();
        let mut skin = match self {
            Theme::Light => MadSkin::default_light(),
            Theme::Dark => MadSkin::default_dark(),
        };
        skin.paragraph.set_fg(palette.text);
        skin.headers[0].set_fg(palette.accent);
        skin.headers[1].set_fg(palette.accent);
        skin.headers[2].set_fg(palette.assistant);
        skin.bold.set_fg(palette.text);
        skin.italic.set_fg(palette.assistant);
        skin.inline_code.set_fg(palette.warning);
        skin.code_block.set_fg(palette.warning);
        skin
    }
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: Color,
    pub text: Color,
    pub muted: Color,
    pub assistant: Color,
    pub warning: Color,
    pub danger: Color,
}

/// Process-wide theme. Read once at startup; `set`/`toggle` are the only mutators.
#[derive(Debug)]
pub struct ThemeController {
    theme: Theme,
    store: Option<PreferenceStore>,
}

impl ThemeController {
    /// Loads the saved theme, falling back to light when absent or unreadable.
    pub fn load(store: Option<PreferenceStore>) -> Self {
        let saved = match &store {
            Some(store) =>
                match store.get(THEME_KEY) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("Could not read saved theme: {}", e);
                        None
                    }
                },
            None => None,
        };

        let theme = match saved.as_deref().map(Theme::from_str) {
            Some(Ok(theme)) => theme,
            Some(Err(e)) => {
                warn!("{}; using light", e);
                Theme::Light
            }
            None => Theme::Light,
        };
        info!("Theme: {}", theme);

        Self { theme, store }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Applies the theme in memory even if saving it fails.
    pub fn set(&mut self, theme: Theme) -> Result<(), PreferenceError> {
        self.theme = theme;
        match &self.store {
            Some(store) => store.set(THEME_KEY, theme.as_str()),
            None => Ok(()),
        }
    }

    pub fn toggle(&mut self) -> Result<Theme, PreferenceError> {
        let next = self.theme.toggled();
        self.set(next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{ tempdir, TempDir };

    fn scratch_store() -> (PreferenceStore, TempDir) {
        let dir = tempdir().unwrap();
        (PreferenceStore::new(dir.path().join("preferences.json")), dir)
    }

    #[test]
    fn parses_and_toggles() {
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!(" light ".parse::<Theme>(), Ok(Theme::Light));
        assert!("sepia".parse::<Theme>().is_err());
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_ne!(Theme::Light.palette(), Theme::Dark.palette());
    }

    #[test]
    fn defaults_to_light_without_a_saved_value() {
        let (store, _dir) = scratch_store();
        assert_eq!(ThemeController::load(Some(store)).theme(), Theme::Light);
        assert_eq!(ThemeController::load(None).theme(), Theme::Light);
    }

    #[test]
    fn toggle_persists_across_controllers() {
        let (store, _dir) = scratch_store();
        let mut controller = ThemeController::load(Some(store.clone()));
        assert_eq!(controller.toggle().unwrap(), Theme::Dark);

        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(ThemeController::load(Some(store.clone())).theme(), Theme::Dark);

        controller.toggle().unwrap();
        assert_eq!(ThemeController::load(Some(store)).theme(), Theme::Light);
    }

    #[test]
    fn unknown_saved_value_falls_back_to_light() {
        let (store, _dir) = scratch_store();
        store.set(THEME_KEY, "neon").unwrap();
        assert_eq!(ThemeController::load(Some(store)).theme(), Theme::Light);
    }
}
