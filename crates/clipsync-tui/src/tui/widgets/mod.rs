// TUI widget modules for each panel.

pub mod placeholder;
pub mod player;
pub mod playlist;
pub mod status_bar;
