//! Scheduler behavior against a scripted backend.
//!
//! Items "play" for a fixed wall-clock duration; the mock records every
//! call so tests can check ordering, stop handling, and fault isolation.

use std::collections::HashSet;
use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::atomic::{ AtomicU8, AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };
use std::thread;
use std::time::{ Duration, Instant };

use loopdeck_core::{
    BackendError, PlaybackBackend, PlayerConfig, RunState, Scheduler, SchedulerError,
    SchedulerTiming,
};


// ===== Test Helpers =====

#[derive( Default )]
struct MockBackend {
    item_duration: Duration,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    /// Blocks the first `play` call for this long
    slow_first_play: Mutex<Option<Duration>>,
    playing_until: Mutex<Option<Instant>>,
    plays: Mutex<Vec<String>>,
    overlaps: AtomicUsize,
    stops: AtomicUsize,
    pauses: AtomicUsize,
    volume: AtomicU8,
}


impl MockBackend {
    fn new( item_duration: Duration ) -> Self {
        Self { item_duration, ..Self::default() }
    }


    fn plays( &self ) -> Vec<String> {
        self.plays.lock().unwrap().clone()
    }


    fn play_count( &self ) -> usize {
        self.plays.lock().unwrap().len()
    }
}


fn file_name( path: &Path ) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}


impl PlaybackBackend for MockBackend {
    fn play( &self, path: &Path ) -> Result<(), BackendError> {
        let name = file_name( path );
        self.plays.lock().unwrap().push( name.clone() );

        let slow = self.slow_first_play.lock().unwrap().take();
        if let Some( delay ) = slow {
            thread::sleep( delay );
        }

        if self.panicking.contains( &name ) {
            panic!( "decoder exploded on {}", name );
        }
        if self.failing.contains( &name ) {
            return Err( BackendError::Failed( format!( "corrupt file {}", name ) ) );
        }

        let mut until = self.playing_until.lock().unwrap();
        if until.is_some_and( |t| Instant::now() < t ) {
            self.overlaps.fetch_add( 1, Ordering::SeqCst );
        }
        *until = Some( Instant::now() + self.item_duration );
        Ok(())
    }


    fn stop( &self ) {
        self.stops.fetch_add( 1, Ordering::SeqCst );
        *self.playing_until.lock().unwrap() = None;
    }


    fn pause( &self ) {
        self.pauses.fetch_add( 1, Ordering::SeqCst );
    }


    fn is_playing( &self ) -> bool {
        self.playing_until.lock().unwrap().is_some_and( |t| Instant::now() < t )
    }


    fn set_volume( &self, volume: u8 ) {
        self.volume.store( volume, Ordering::SeqCst );
    }
}


fn fast_timing() -> SchedulerTiming {
    SchedulerTiming {
        empty_retry: Duration::from_millis( 10 ),
        poll_interval: Duration::from_millis( 5 ),
        stop_timeout: Duration::from_secs( 2 ),
    }
}


fn config_for( dir: &Path ) -> PlayerConfig {
    PlayerConfig {
        media_dir: dir.to_path_buf(),
        loop_delay: Duration::ZERO,
        ..PlayerConfig::default()
    }
}


fn scheduler_with( dir: &Path, backend: &Arc<MockBackend> ) -> Scheduler {
    let backend: Arc<dyn PlaybackBackend> = backend.clone();
    Scheduler::with_timing( config_for( dir ), backend, fast_timing() )
}


fn media_dir( names: &[&str] ) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        fs::write( dir.path().join( name ), b"x" ).unwrap();
    }
    dir
}


fn wait_until( mut condition: impl FnMut() -> bool ) -> bool {
    let deadline = Instant::now() + Duration::from_secs( 5 );
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep( Duration::from_millis( 5 ) );
    }
    false
}


// ===== Tests =====

#[test]
fn test_plays_in_name_order_and_wraps() {
    let dir = media_dir( &[ "c.mkv", "a.mp4", "b.jpg" ] );
    let backend = Arc::new( MockBackend::new( Duration::from_millis( 15 ) ) );
    let scheduler = scheduler_with( dir.path(), &backend );

    scheduler.start().unwrap();
    assert!( wait_until( || backend.play_count() >= 4 ) );
    scheduler.stop();

    assert_eq!( &backend.plays()[ ..4 ], &[ "a.mp4", "b.jpg", "c.mkv", "a.mp4" ] );
}


#[test]
fn test_start_twice_keeps_single_loop() {
    let dir = media_dir( &[ "a.mp4", "b.mp4" ] );
    let backend = Arc::new( MockBackend::new( Duration::from_millis( 20 ) ) );
    let scheduler = scheduler_with( dir.path(), &backend );

    scheduler.start().unwrap();
    scheduler.start().unwrap();
    assert_eq!( scheduler.run_state(), RunState::Running );

    assert!( wait_until( || backend.play_count() >= 6 ) );
    scheduler.stop();

    assert_eq!( backend.overlaps.load( Ordering::SeqCst ), 0 );
}


#[test]
fn test_start_refreshes_playlist_while_running() {
    let dir = media_dir( &[ "a.mp4" ] );
    let backend = Arc::new( MockBackend::new( Duration::from_millis( 20 ) ) );
    let scheduler = scheduler_with( dir.path(), &backend );

    scheduler.start().unwrap();
    fs::write( dir.path().join( "b.mp4" ), b"x" ).unwrap();
    scheduler.start().unwrap();

    assert_eq!( scheduler.current_playlist().len(), 2 );
    scheduler.stop();
}


#[test]
fn test_stop_halts_playback() {
    let dir = media_dir( &[ "a.mp4", "b.mp4" ] );
    let backend = Arc::new( MockBackend::new( Duration::from_secs( 60 ) ) );
    let scheduler = scheduler_with( dir.path(), &backend );

    scheduler.start().unwrap();
    assert!( wait_until( || scheduler.is_playing() ) );

    let started = Instant::now();
    scheduler.stop();
    assert!( started.elapsed() < Duration::from_secs( 2 ) );

    assert!( wait_until( || !scheduler.is_playing() ) );
    assert_eq!( scheduler.run_state(), RunState::Idle );
    assert_eq!( scheduler.now_playing(), None );

    let count = backend.play_count();
    thread::sleep( Duration::from_millis( 50 ) );
    assert_eq!( backend.play_count(), count );
}


#[test]
fn test_stop_during_slow_start_returns_within_timeout() {
    let dir = media_dir( &[ "a.mp4", "b.mp4" ] );
    let mock = MockBackend::new( Duration::from_millis( 5 ) );
    *mock.slow_first_play.lock().unwrap() = Some( Duration::from_millis( 800 ) );
    let backend = Arc::new( mock );
    let timing = SchedulerTiming { stop_timeout: Duration::from_millis( 100 ), ..fast_timing() };
    let as_backend: Arc<dyn PlaybackBackend> = backend.clone();
    let scheduler = Scheduler::with_timing( config_for( dir.path() ), as_backend, timing );

    scheduler.start().unwrap();
    assert!( wait_until( || backend.play_count() >= 1 ) );

    let started = Instant::now();
    scheduler.stop();
    assert!( started.elapsed() < Duration::from_millis( 500 ) );

    // The item that was starting is stopped and nothing follows it
    assert!( wait_until( || scheduler.run_state() == RunState::Idle ) );
    assert_eq!( backend.plays(), vec![ "a.mp4" ] );
    assert!( !backend.is_playing() );
}


#[test]
fn test_stop_timeout_leaves_loop_stopping_until_it_exits() {
    let dir = media_dir( &[ "a.mp4" ] );
    let mock = MockBackend::new( Duration::from_millis( 5 ) );
    *mock.slow_first_play.lock().unwrap() = Some( Duration::from_millis( 1500 ) );
    let backend = Arc::new( mock );
    let timing = SchedulerTiming { stop_timeout: Duration::from_millis( 100 ), ..fast_timing() };
    let as_backend: Arc<dyn PlaybackBackend> = backend.clone();
    let scheduler = Scheduler::with_timing( config_for( dir.path() ), as_backend, timing );

    scheduler.start().unwrap();
    assert!( wait_until( || backend.play_count() >= 1 ) );

    let started = Instant::now();
    scheduler.stop();
    assert!( started.elapsed() < Duration::from_millis( 1000 ) );
    assert_eq!( scheduler.run_state(), RunState::Stopping );

    assert!( matches!( scheduler.start(), Err( SchedulerError::PreviousLoopAlive ) ) );

    assert!( wait_until( || scheduler.run_state() == RunState::Idle ) );
    assert_eq!( backend.play_count(), 1 );

    scheduler.start().unwrap();
    assert_eq!( scheduler.run_state(), RunState::Running );
    assert!( wait_until( || backend.play_count() >= 2 ) );
    scheduler.stop();
    assert_eq!( scheduler.run_state(), RunState::Idle );
}


#[test]
fn test_stop_while_idle_is_noop() {
    let dir = media_dir( &[] );
    let backend = Arc::new( MockBackend::new( Duration::from_millis( 10 ) ) );
    let scheduler = scheduler_with( dir.path(), &backend );

    scheduler.stop();
    scheduler.stop();

    assert_eq!( scheduler.run_state(), RunState::Idle );
    assert_eq!( backend.stops.load( Ordering::SeqCst ), 0 );
}


#[test]
fn test_restart_after_stop() {
    let dir = media_dir( &[ "a.mp4" ] );
    let backend = Arc::new( MockBackend::new( Duration::from_millis( 10 ) ) );
    let scheduler = scheduler_with( dir.path(), &backend );

    scheduler.start().unwrap();
    assert!( wait_until( || backend.play_count() >= 1 ) );
    scheduler.stop();

    let count = backend.play_count();
    scheduler.start().unwrap();
    assert!( wait_until( || backend.play_count() > count ) );
    assert_eq!( scheduler.run_state(), RunState::Running );
    scheduler.stop();
}


#[test]
fn test_empty_folder_then_refresh_picks_up_item() {
    let dir = media_dir( &[] );
    let backend = Arc::new( MockBackend::new( Duration::from_millis( 10 ) ) );
    let scheduler = scheduler_with( dir.path(), &backend );

    scheduler.start().unwrap();
    thread::sleep( Duration::from_millis( 40 ) );
    assert_eq!( backend.play_count(), 0 );
    assert_eq!( scheduler.position(), 0 );
    assert_eq!( scheduler.run_state(), RunState::Running );

    fs::write( dir.path().join( "late.mp4" ), b"x" ).unwrap();
    scheduler.refresh_playlist();

    assert!( wait_until( || backend.play_count() >= 2 ) );
    assert_eq!( scheduler.current_playlist(), vec![ dir.path().join( "late.mp4" ) ] );
    assert!( backend.plays().iter().all( |p| p == "late.mp4" ) );
    assert_eq!( scheduler.run_state(), RunState::Running );
    scheduler.stop();
}


#[test]
fn test_refresh_rewinds_position() {
    let dir = media_dir( &[ "a.mp4", "b.mp4", "c.mp4" ] );
    let backend = Arc::new( MockBackend::new( Duration::from_secs( 60 ) ) );
    let scheduler = scheduler_with( dir.path(), &backend );

    scheduler.start().unwrap();
    assert!( wait_until( || backend.play_count() == 1 ) );
    assert_eq!( scheduler.position(), 1 );

    scheduler.refresh_playlist();
    assert_eq!( scheduler.position(), 0 );
    scheduler.stop();
}


#[test]
fn test_failing_items_do_not_kill_loop() {
    let dir = media_dir( &[ "a.mp4", "bad.mp4", "boom.mp4", "d.mp4" ] );
    let mut mock = MockBackend::new( Duration::from_millis( 5 ) );
    mock.failing.insert( "bad.mp4".into() );
    mock.panicking.insert( "boom.mp4".into() );
    let backend = Arc::new( mock );
    let scheduler = scheduler_with( dir.path(), &backend );

    scheduler.start().unwrap();
    assert!( wait_until( || backend.play_count() >= 9 ) );
    assert_eq!( scheduler.run_state(), RunState::Running );
    scheduler.stop();

    let plays = backend.plays();
    assert_eq!( &plays[ ..8 ], &[
        "a.mp4", "bad.mp4", "boom.mp4", "d.mp4",
        "a.mp4", "bad.mp4", "boom.mp4", "d.mp4",
    ]);
}


#[test]
fn test_failed_item_clears_now_playing() {
    let dir = media_dir( &[ "a.mp4", "bad.mp4" ] );
    let mut mock = MockBackend::new( Duration::from_millis( 10 ) );
    mock.failing.insert( "bad.mp4".into() );
    let backend = Arc::new( mock );
    let config = PlayerConfig {
        loop_delay: Duration::from_millis( 300 ),
        ..config_for( dir.path() )
    };
    let as_backend: Arc<dyn PlaybackBackend> = backend.clone();
    let scheduler = Scheduler::with_timing( config, as_backend, fast_timing() );

    scheduler.start().unwrap();
    assert!( wait_until( || scheduler.now_playing().is_some() ) );
    assert!( wait_until( || backend.plays().iter().any( |n| n == "bad.mp4" ) ) );
    assert!( wait_until( || scheduler.now_playing().is_none() ) );

    // Still inside the failure delay, before "a.mp4" comes round again
    assert_eq!( backend.play_count(), 2 );
    scheduler.stop();
}


#[test]
fn test_volume_is_clamped() {
    let dir = media_dir( &[] );
    let backend = Arc::new( MockBackend::new( Duration::ZERO ) );
    let scheduler = scheduler_with( dir.path(), &backend );

    assert_eq!( scheduler.set_volume( 150 ), 100 );
    assert_eq!( scheduler.config().volume, 100 );
    assert_eq!( backend.volume.load( Ordering::SeqCst ), 100 );

    assert_eq!( scheduler.set_volume( -5 ), 0 );
    assert_eq!( scheduler.config().volume, 0 );
    assert_eq!( backend.volume.load( Ordering::SeqCst ), 0 );
}


#[test]
fn test_initial_volume_forwarded() {
    let dir = media_dir( &[] );
    let backend = Arc::new( MockBackend::new( Duration::ZERO ) );
    let _scheduler = scheduler_with( dir.path(), &backend );

    assert_eq!( backend.volume.load( Ordering::SeqCst ), PlayerConfig::default().volume );
}


#[test]
fn test_toggle_pause_keeps_position() {
    let dir = media_dir( &[ "a.mp4", "b.mp4" ] );
    let backend = Arc::new( MockBackend::new( Duration::from_secs( 60 ) ) );
    let scheduler = scheduler_with( dir.path(), &backend );

    scheduler.start().unwrap();
    assert!( wait_until( || backend.play_count() == 1 ) );

    scheduler.toggle_pause();
    scheduler.toggle_pause();

    assert_eq!( backend.pauses.load( Ordering::SeqCst ), 2 );
    assert_eq!( scheduler.position(), 1 );
    assert_eq!( scheduler.run_state(), RunState::Running );
    assert_eq!( scheduler.now_playing(), Some( dir.path().join( "a.mp4" ) ) );
    scheduler.stop();
}


#[test]
fn test_set_config_applies_on_refresh() {
    let first = media_dir( &[ "a.mp4" ] );
    let second = media_dir( &[ "x.png", "y.png" ] );
    let backend = Arc::new( MockBackend::new( Duration::ZERO ) );
    let scheduler = scheduler_with( first.path(), &backend );

    scheduler.refresh_playlist();
    assert_eq!( scheduler.current_playlist().len(), 1 );

    let mut config = config_for( second.path() );
    config.volume = 33;
    scheduler.set_config( config );
    assert_eq!( backend.volume.load( Ordering::SeqCst ), 33 );
    assert_eq!( scheduler.current_playlist().len(), 1 );

    scheduler.refresh_playlist();
    let expected: Vec<PathBuf> = vec![ second.path().join( "x.png" ), second.path().join( "y.png" ) ];
    assert_eq!( scheduler.current_playlist(), expected );
}
