// Client orchestration: server API, playlist, selection, playback surface,
// transport reporting and the main event loop.

pub mod api;
pub mod app;
pub mod player;
pub mod playlist;
pub mod reporter;
pub mod selection;
