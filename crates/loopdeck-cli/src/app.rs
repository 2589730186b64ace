//! Settings surface state and key handling.

use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::{ KeyCode, KeyModifiers };
use loopdeck_core::{ PlaybackBackend, PlayerConfig, RunState, Scheduler };
use ratatui::widgets::ListState;

use crate::browser::FolderBrowser;
use crate::form::{ Field, SettingsForm };
use crate::input::InputMode;
use crate::view::ViewMode;


/// Application state.
pub struct App {
    pub scheduler: Scheduler,
    pub config_path: PathBuf,
    pub form: SettingsForm,
    pub input_mode: InputMode,
    pub view_mode: ViewMode,
    pub browser: Option<FolderBrowser>,
    pub browser_state: ListState,

    // Snapshot of scheduler state, refreshed every tick
    pub playlist: Vec<PathBuf>,
    pub now_playing: Option<PathBuf>,
    pub run_state: RunState,
    pub is_playing: bool,
    pub playlist_state: ListState,

    pub status: String,
    pub should_quit: bool,
}


impl App {
    /// Loads the config and starts playback when autoplay is set.
    pub fn new( config_path: PathBuf, backend: Arc<dyn PlaybackBackend> ) -> Self {
        let config = PlayerConfig::load( &config_path );
        let form = SettingsForm::from_config( &config );
        let autoplay = config.autoplay;
        let scheduler = Scheduler::new( config, backend );

        let mut app = Self {
            scheduler,
            config_path,
            form,
            input_mode: InputMode::Normal,
            view_mode: ViewMode::Settings,
            browser: None,
            browser_state: ListState::default(),
            playlist: Vec::new(),
            now_playing: None,
            run_state: RunState::Idle,
            is_playing: false,
            playlist_state: ListState::default(),
            status: "Ready".to_string(),
            should_quit: false,
        };

        if autoplay {
            app.start_playback_with_current_config();
        } else {
            app.scheduler.refresh_playlist();
        }

        app.tick();
        app
    }


    /// Refreshes the cached scheduler snapshot.
    pub fn tick( &mut self ) {
        self.playlist = self.scheduler.current_playlist();
        self.now_playing = self.scheduler.now_playing();
        self.run_state = self.scheduler.run_state();
        self.is_playing = self.scheduler.is_playing();

        let selected = self.now_playing
            .as_ref()
            .and_then( |p| self.playlist.iter().position( |item| item == p ) );
        self.playlist_state.select( selected );
    }


    pub fn handle_key( &mut self, code: KeyCode, modifiers: KeyModifiers ) {
        if modifiers.contains( KeyModifiers::CONTROL ) && code == KeyCode::Char( 'c' ) {
            self.should_quit = true;
            return;
        }

        match self.view_mode {
            ViewMode::Help => self.view_mode = ViewMode::Settings,
            ViewMode::FolderPicker => self.handle_picker_key( code ),
            ViewMode::Settings => match self.input_mode {
                InputMode::Editing => self.handle_edit_key( code ),
                InputMode::Normal => self.handle_form_key( code ),
            },
        }
    }


    fn handle_form_key( &mut self, code: KeyCode ) {
        match code {
            KeyCode::Up | KeyCode::BackTab => self.form.focus = self.form.focus.previous(),
            KeyCode::Down | KeyCode::Tab => self.form.focus = self.form.focus.next(),
            KeyCode::Left | KeyCode::Char( '-' ) => self.form.adjust( -1 ),
            KeyCode::Right | KeyCode::Char( '+' ) => self.form.adjust( 1 ),
            KeyCode::Enter => {
                if self.form.focus == Field::MediaDir {
                    self.input_mode = InputMode::Editing;
                } else {
                    self.form.adjust( 1 );
                }
            }
            KeyCode::Char( 'b' ) => self.open_folder_picker(),
            KeyCode::Char( 's' ) => {
                self.save_settings();
            }
            KeyCode::Char( 'r' ) | KeyCode::F( 5 ) => self.start_playback(),
            KeyCode::Char( 'x' ) => self.stop_playback(),
            KeyCode::Char( ' ' ) | KeyCode::Char( 'p' ) => self.toggle_pause(),
            KeyCode::Char( '?' ) => self.view_mode = ViewMode::Help,
            KeyCode::Char( 'q' ) | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }


    fn handle_edit_key( &mut self, code: KeyCode ) {
        let buffer = &mut self.form.media_dir;

        match code {
            KeyCode::Char( c ) => buffer.insert( c ),
            KeyCode::Backspace => buffer.backspace(),
            KeyCode::Delete => buffer.delete(),
            KeyCode::Left => buffer.move_left(),
            KeyCode::Right => buffer.move_right(),
            KeyCode::Home => buffer.move_home(),
            KeyCode::End => buffer.move_end(),
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => self.input_mode = InputMode::Normal,
            _ => {}
        }
    }


    fn handle_picker_key( &mut self, code: KeyCode ) {
        let Some( browser ) = self.browser.as_mut() else {
            self.view_mode = ViewMode::Settings;
            return;
        };

        match code {
            KeyCode::Up | KeyCode::Char( 'k' ) => browser.select_previous(),
            KeyCode::Down | KeyCode::Char( 'j' ) => browser.select_next(),
            KeyCode::Enter | KeyCode::Right => browser.enter_selected(),
            KeyCode::Backspace | KeyCode::Left => browser.go_up(),
            KeyCode::Char( 'c' ) => {
                let chosen = browser.current_dir().to_string_lossy().to_string();
                self.form.media_dir.set( chosen );
                self.browser = None;
                self.view_mode = ViewMode::Settings;
                self.status = "Folder selected, press s to save".to_string();
                return;
            }
            KeyCode::Esc | KeyCode::Char( 'q' ) => {
                self.browser = None;
                self.view_mode = ViewMode::Settings;
                return;
            }
            _ => {}
        }

        self.browser_state.select( Some( browser.selected_index() ) );
    }


    fn open_folder_picker( &mut self ) {
        let start = PathBuf::from( self.form.media_dir.content().trim() );
        let browser = FolderBrowser::open( &start );
        self.browser_state.select( Some( browser.selected_index() ) );
        self.browser = Some( browser );
        self.view_mode = ViewMode::FolderPicker;
    }


    /// Writes the form to disk and applies it to the scheduler.
    ///
    /// The playlist is rebuilt and the volume applied even if writing the
    /// file fails.
    pub fn save_settings( &mut self ) -> bool {
        let config = self.form.to_config();
        let volume = config.volume;

        let saved = match config.save( &self.config_path ) {
            Ok(()) => true,
            Err( e ) => {
                tracing::warn!( "Failed to save config {:?}: {}", self.config_path, e );
                self.status = format!( "Save failed: {}", e );
                false
            }
        };

        self.scheduler.set_config( config );
        self.scheduler.refresh_playlist();
        self.scheduler.set_volume( volume.into() );

        if saved {
            self.status = "Settings saved".to_string();
        }
        saved
    }


    /// Saves the form, then starts the loop (or refreshes a running one).
    pub fn start_playback( &mut self ) {
        self.save_settings();
        self.start_playback_with_current_config();
    }


    fn start_playback_with_current_config( &mut self ) {
        self.status = match self.scheduler.start() {
            Ok(()) => "Playback running".to_string(),
            Err( e ) => {
                tracing::warn!( "Failed to start playback: {}", e );
                format!( "Start failed: {}", e )
            }
        };
    }


    pub fn stop_playback( &mut self ) {
        self.scheduler.stop();
        self.status = "Playback stopped".to_string();
    }


    pub fn toggle_pause( &mut self ) {
        self.scheduler.toggle_pause();
        self.status = "Pause toggled".to_string();
    }


    /// Stops playback before exit.
    pub fn shutdown( &mut self ) {
        self.scheduler.stop();
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    use loopdeck_core::BackendError;


    /// Backend whose items finish as soon as they start.
    #[derive( Default )]
    struct InstantBackend {
        plays: AtomicUsize,
        pauses: AtomicUsize,
    }


    impl PlaybackBackend for InstantBackend {
        fn play( &self, _path: &Path ) -> Result<(), BackendError> {
            self.plays.fetch_add( 1, Ordering::SeqCst );
            Ok(())
        }

        fn stop( &self ) {}

        fn pause( &self ) {
            self.pauses.fetch_add( 1, Ordering::SeqCst );
        }

        fn is_playing( &self ) -> bool {
            false
        }

        fn set_volume( &self, _volume: u8 ) {}
    }


    fn write_config( dir: &Path, autoplay: bool ) -> PathBuf {
        let media = dir.join( "media" );
        fs::create_dir( &media ).unwrap();
        fs::write( media.join( "a.mp4" ), b"" ).unwrap();
        fs::write( media.join( "b.png" ), b"" ).unwrap();

        let config = PlayerConfig {
            media_dir: media,
            autoplay,
            ..PlayerConfig::default()
        };
        let path = dir.join( "config.json" );
        config.save( &path ).unwrap();
        path
    }


    fn press( app: &mut App, code: KeyCode ) {
        app.handle_key( code, KeyModifiers::NONE );
    }


    #[test]
    fn test_without_autoplay_shows_playlist_but_stays_idle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config( dir.path(), false );
        let backend = Arc::new( InstantBackend::default() );

        let mut app = App::new( path, backend.clone() );
        assert_eq!( app.playlist.len(), 2 );
        assert_eq!( app.run_state, RunState::Idle );

        app.shutdown();
        assert_eq!( backend.plays.load( Ordering::SeqCst ), 0 );
    }


    #[test]
    fn test_autoplay_starts_loop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config( dir.path(), true );

        let mut app = App::new( path, Arc::new( InstantBackend::default() ) );
        assert_eq!( app.run_state, RunState::Running );

        press( &mut app, KeyCode::Char( 'x' ) );
        app.tick();
        assert_eq!( app.run_state, RunState::Idle );
        assert_eq!( app.status, "Playback stopped" );
    }


    #[test]
    fn test_save_writes_form_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config( dir.path(), false );
        let mut app = App::new( path.clone(), Arc::new( InstantBackend::default() ) );

        // Shuffle on, volume down one step
        press( &mut app, KeyCode::Down );
        press( &mut app, KeyCode::Down );
        press( &mut app, KeyCode::Enter );
        press( &mut app, KeyCode::Down );
        press( &mut app, KeyCode::Left );
        press( &mut app, KeyCode::Char( 's' ) );

        let saved = PlayerConfig::load( &path );
        assert!( saved.shuffle );
        assert_eq!( saved.volume, 75 );
        assert_eq!( app.scheduler.config().volume, 75 );
        assert_eq!( app.status, "Settings saved" );
        app.shutdown();
    }


    #[test]
    fn test_editing_media_dir_and_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config( dir.path(), false );
        let other = dir.path().join( "other" );
        fs::create_dir( &other ).unwrap();
        fs::write( other.join( "only.mkv" ), b"" ).unwrap();

        let mut app = App::new( path.clone(), Arc::new( InstantBackend::default() ) );

        press( &mut app, KeyCode::Enter );
        assert_eq!( app.input_mode, InputMode::Editing );
        app.form.media_dir.set( "" );
        for c in other.to_string_lossy().chars() {
            press( &mut app, KeyCode::Char( c ) );
        }
        press( &mut app, KeyCode::Enter );
        assert_eq!( app.input_mode, InputMode::Normal );

        press( &mut app, KeyCode::Char( 'r' ) );
        app.tick();
        assert_eq!( app.playlist, vec![ other.join( "only.mkv" ) ] );
        assert_eq!( PlayerConfig::load( &path ).media_dir, other );
        app.shutdown();
    }


    #[test]
    fn test_folder_picker_sets_media_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config( dir.path(), false );
        let mut app = App::new( path, Arc::new( InstantBackend::default() ) );

        press( &mut app, KeyCode::Char( 'b' ) );
        assert_eq!( app.view_mode, ViewMode::FolderPicker );

        press( &mut app, KeyCode::Backspace );
        press( &mut app, KeyCode::Char( 'c' ) );
        assert_eq!( app.view_mode, ViewMode::Settings );
        assert_eq!( app.form.media_dir.content(), dir.path().to_string_lossy() );
        app.shutdown();
    }


    #[test]
    fn test_pause_and_quit_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config( dir.path(), false );
        let backend = Arc::new( InstantBackend::default() );
        let mut app = App::new( path, backend.clone() );

        press( &mut app, KeyCode::Char( ' ' ) );
        assert_eq!( backend.pauses.load( Ordering::SeqCst ), 1 );

        press( &mut app, KeyCode::Char( '?' ) );
        assert_eq!( app.view_mode, ViewMode::Help );
        press( &mut app, KeyCode::Char( 'q' ) );
        assert!( !app.should_quit );

        app.handle_key( KeyCode::Char( 'c' ), KeyModifiers::CONTROL );
        assert!( app.should_quit );
    }
}
