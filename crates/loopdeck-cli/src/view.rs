//! Screens of the settings surface.


/// Current screen.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum ViewMode {
    /// Settings form with the playlist beside it.
    #[default]
    Settings,

    /// Folder picker for the media folder.
    FolderPicker,

    /// Key reference.
    Help,
}


impl ViewMode {
    /// Header label for the screen.
    pub fn title( &self ) -> &'static str {
        match self {
            ViewMode::Settings => "SETTINGS",
            ViewMode::FolderPicker => "CHOOSE FOLDER",
            ViewMode::Help => "HELP",
        }
    }
}


/// Returns the key reference shown on the help screen.
pub fn help_text() -> &'static str {
    r#"Settings:
  Up/Down, Tab    Move between fields
  Left/Right      Change value (toggle, volume, delay)
  Enter           Edit folder / toggle option
  b               Choose media folder

Playback:
  s               Save settings
  r, F5           Save and start / refresh playlist
  x               Stop playback
  Space, p        Pause / resume

Folder picker:
  Enter           Open folder
  Backspace       Parent folder
  c               Use current folder
  Esc             Cancel

Other:
  ?               Toggle this help
  q, Esc          Quit (stops playback)"#
}
