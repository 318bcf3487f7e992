pub mod input;
pub mod preferences;
pub mod render;
pub mod theme;

pub use input::{ Command, CommandError, InputEvent, InputLine };
pub use preferences::{ PreferenceError, PreferenceStore };
pub use render::{ relative_date, Frame, Renderer };
pub use theme::{ Theme, ThemeController };
