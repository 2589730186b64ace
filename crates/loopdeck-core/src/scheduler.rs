//! Loop scheduler
//!
//! Owns the playlist and the play position, and runs the background loop
//! that hands items to the backend one after another, wrapping around at
//! the end of the playlist.

use std::panic::{ self, AssertUnwindSafe };
use std::path::{ Path, PathBuf };
use std::sync::mpsc::{ self, RecvTimeoutError, TryRecvError };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::{ Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock };
use std::thread::{ self, JoinHandle };
use std::time::Duration;

use thiserror::Error;

use crate::backend::PlaybackBackend;
use crate::config::{ clamp_volume, PlayerConfig };
use crate::library::build_playlist;


/// Errors that can occur when starting the loop.
#[derive( Debug, Error )]
pub enum SchedulerError {
    #[error( "Failed to spawn playback loop: {0}" )]
    Spawn( #[from] std::io::Error ),

    #[error( "Previous playback loop is still shutting down" )]
    PreviousLoopAlive,
}


/// Lifecycle of the background loop.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum RunState {
    Idle,
    Running,
    Stopping,
}


/// Waits used by the background loop.
#[derive( Debug, Clone, Copy )]
pub struct SchedulerTiming {
    /// Sleep between checks while the playlist is empty
    pub empty_retry: Duration,

    /// Interval between `is_playing` polls
    pub poll_interval: Duration,

    /// How long `stop` waits for the loop to exit
    pub stop_timeout: Duration,
}


impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            empty_retry: Duration::from_millis( 500 ),
            poll_interval: Duration::from_millis( 200 ),
            stop_timeout: Duration::from_secs( 1 ),
        }
    }
}


/// One-shot termination flag with interruptible waits.
///
/// The flag itself is atomic; the mutex only backs the condvar so waiters
/// cannot miss a wakeup.
#[derive( Debug, Default )]
struct StopSignal {
    stopped: AtomicBool,
    lock: Mutex<()>,
    cvar: Condvar,
}


impl StopSignal {
    fn set( &self ) {
        self.stopped.store( true, Ordering::SeqCst );
        let _guard = self.lock.lock().unwrap_or_else( PoisonError::into_inner );
        self.cvar.notify_all();
    }


    fn is_set( &self ) -> bool {
        self.stopped.load( Ordering::SeqCst )
    }


    /// Sleeps up to `timeout`. Returns true if stop was signalled.
    fn wait( &self, timeout: Duration ) -> bool {
        let guard = self.lock.lock().unwrap_or_else( PoisonError::into_inner );
        let _ = self.cvar
            .wait_timeout_while( guard, timeout, |_| !self.is_set() )
            .unwrap_or_else( PoisonError::into_inner );
        self.is_set()
    }
}


/// Playlist plus play position, always read and written together.
#[derive( Debug, Default )]
struct Queue {
    items: Vec<PathBuf>,
    position: usize,
}


impl Queue {
    /// Replaces the items and rewinds to the first one.
    fn replace( &mut self, items: Vec<PathBuf> ) {
        self.items = items;
        self.position = 0;
    }


    /// Returns the item at the position and moves past it, wrapping.
    ///
    /// Returns None without moving when the queue is empty.
    fn advance( &mut self ) -> Option<PathBuf> {
        if self.items.is_empty() {
            return None;
        }
        if self.position >= self.items.len() {
            self.position = 0;
        }

        let item = self.items[ self.position ].clone();
        self.position = ( self.position + 1 ) % self.items.len();
        Some( item )
    }


    /// Gets the items.
    fn items( &self ) -> &[PathBuf] {
        &self.items
    }


    /// Gets the index of the next item to play.
    fn position( &self ) -> usize {
        self.position
    }
}


/// State shared with the background loop.
struct Shared {
    backend: Arc<dyn PlaybackBackend>,
    config: RwLock<PlayerConfig>,
    queue: Mutex<Queue>,
    now_playing: Mutex<Option<PathBuf>>,
    timing: SchedulerTiming,
}


impl Shared {
    fn queue( &self ) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else( PoisonError::into_inner )
    }


    fn now_playing( &self ) -> MutexGuard<'_, Option<PathBuf>> {
        self.now_playing.lock().unwrap_or_else( PoisonError::into_inner )
    }


    fn config( &self ) -> PlayerConfig {
        self.config.read().unwrap_or_else( PoisonError::into_inner ).clone()
    }
}


/// Handle to a spawned loop.
struct Worker {
    stop: Arc<StopSignal>,
    /// Disconnects when the loop thread exits
    exited: mpsc::Receiver<()>,
    thread: JoinHandle<()>,
}


impl Worker {
    fn has_exited( &self ) -> bool {
        matches!( self.exited.try_recv(), Err( TryRecvError::Disconnected ) )
    }


    fn wait_exit( &self, timeout: Duration ) -> bool {
        matches!( self.exited.recv_timeout( timeout ), Err( RecvTimeoutError::Disconnected ) )
    }


    fn join( self ) {
        if self.thread.join().is_err() {
            tracing::error!( "Playback loop panicked" );
        }
    }
}


/// Loops a media folder through a playback backend.
///
/// All methods take `&self`; share the scheduler between the control
/// surface and other threads with an `Arc`.
pub struct Scheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}


impl Scheduler {
    /// Creates an idle scheduler with default timing.
    pub fn new( config: PlayerConfig, backend: Arc<dyn PlaybackBackend> ) -> Self {
        Self::with_timing( config, backend, SchedulerTiming::default() )
    }


    /// Creates an idle scheduler with custom loop timing.
    pub fn with_timing(
        config: PlayerConfig,
        backend: Arc<dyn PlaybackBackend>,
        timing: SchedulerTiming,
    ) -> Self {
        backend.set_volume( config.volume.min( 100 ) );

        Self {
            shared: Arc::new( Shared {
                backend,
                config: RwLock::new( config ),
                queue: Mutex::new( Queue::default() ),
                now_playing: Mutex::new( None ),
                timing,
            }),
            worker: Mutex::new( None ),
        }
    }


    fn worker( &self ) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else( PoisonError::into_inner )
    }


    /// Rebuilds the playlist and starts the loop if it is not running.
    ///
    /// The playlist is rebuilt even when the loop is already running.
    pub fn start( &self ) -> Result<(), SchedulerError> {
        self.refresh_playlist();

        let mut worker = self.worker();

        if let Some( ref current ) = *worker {
            if !current.has_exited() {
                if !current.stop.is_set() {
                    tracing::debug!( "Playback loop already running" );
                    return Ok(());
                }

                tracing::info!( "Waiting for previous playback loop to exit" );
                if !current.wait_exit( self.shared.timing.stop_timeout ) {
                    return Err( SchedulerError::PreviousLoopAlive );
                }
            }
        }

        if let Some( finished ) = worker.take() {
            finished.join();
        }

        let stop = Arc::new( StopSignal::default() );
        let ( exit_tx, exited ) = mpsc::channel::<()>();

        let shared = Arc::clone( &self.shared );
        let loop_stop = Arc::clone( &stop );

        let thread = thread::Builder::new()
            .name( "loopdeck-scheduler".into() )
            .spawn( move || {
                let _exit_guard = exit_tx;
                advance_loop( &shared, &loop_stop );
            })?;

        *worker = Some( Worker { stop, exited, thread } );
        tracing::info!( "Playback started" );
        Ok(())
    }


    /// Stops the loop and the current item.
    ///
    /// Waits up to the stop timeout for the loop to exit. If it does not,
    /// the call returns anyway and the loop exits at its next check.
    pub fn stop( &self ) {
        let mut worker = self.worker();

        let Some( ref current ) = *worker else {
            tracing::debug!( "Stop requested while idle" );
            return;
        };

        current.stop.set();
        self.shared.backend.stop();

        if current.wait_exit( self.shared.timing.stop_timeout ) {
            if let Some( finished ) = worker.take() {
                finished.join();
            }
            tracing::info!( "Playback stopped" );
        } else {
            tracing::warn!(
                "Playback loop did not exit within {:?}",
                self.shared.timing.stop_timeout
            );
        }
    }


    /// Rebuilds the playlist from the current config and rewinds to the start.
    ///
    /// A running loop picks up the new playlist at its next item.
    pub fn refresh_playlist( &self ) {
        let config = self.shared.config();
        let items = build_playlist( &config.media_dir, config.shuffle );
        self.shared.queue().replace( items );
    }


    /// Sets the volume, clamped to 0-100. Returns the applied value.
    pub fn set_volume( &self, volume: i32 ) -> u8 {
        let volume = clamp_volume( volume.into() );
        self.shared.config.write().unwrap_or_else( PoisonError::into_inner ).volume = volume;
        self.shared.backend.set_volume( volume );
        tracing::debug!( "Volume set to {}", volume );
        volume
    }


    /// Toggles pause on the current item.
    pub fn toggle_pause( &self ) {
        self.shared.backend.pause();
    }


    /// Returns true while the backend is rendering an item.
    pub fn is_playing( &self ) -> bool {
        self.shared.backend.is_playing()
    }


    /// Returns a copy of the current playlist.
    pub fn current_playlist( &self ) -> Vec<PathBuf> {
        self.shared.queue().items().to_vec()
    }


    /// Gets the index of the next item the loop will play.
    pub fn position( &self ) -> usize {
        self.shared.queue().position()
    }


    /// Gets the item most recently started by the loop.
    pub fn now_playing( &self ) -> Option<PathBuf> {
        self.shared.now_playing().clone()
    }


    /// Gets the lifecycle state of the background loop.
    pub fn run_state( &self ) -> RunState {
        match *self.worker() {
            Some( ref w ) if !w.has_exited() => {
                if w.stop.is_set() { RunState::Stopping } else { RunState::Running }
            }
            _ => RunState::Idle,
        }
    }


    /// Returns a copy of the current config.
    pub fn config( &self ) -> PlayerConfig {
        self.shared.config()
    }


    /// Replaces the config used by later refreshes and applies its volume.
    pub fn set_config( &self, mut config: PlayerConfig ) {
        config.volume = config.volume.min( 100 );
        let volume = config.volume;
        *self.shared.config.write().unwrap_or_else( PoisonError::into_inner ) = config;
        self.shared.backend.set_volume( volume );
    }
}


impl Drop for Scheduler {
    fn drop( &mut self ) {
        self.stop();
    }
}


fn advance_loop( shared: &Shared, stop: &StopSignal ) {
    tracing::debug!( "Playback loop entered" );

    while !stop.is_set() {
        let next = shared.queue().advance();

        let Some( path ) = next else {
            if stop.wait( shared.timing.empty_retry ) {
                break;
            }
            continue;
        };

        play_item( shared, stop, &path );
    }

    *shared.now_playing() = None;
    tracing::debug!( "Playback loop exited" );
}


/// Plays one item to completion, failure, or stop.
fn play_item( shared: &Shared, stop: &StopSignal, path: &Path ) {
    if stop.is_set() {
        return;
    }

    let started = panic::catch_unwind( AssertUnwindSafe( || shared.backend.play( path ) ) );

    // Stop may have arrived while the backend was starting the item
    if stop.is_set() {
        shared.backend.stop();
        return;
    }

    let failure = match started {
        Ok( Ok(()) ) => None,
        Ok( Err( e ) ) => Some( e.to_string() ),
        Err( _ ) => Some( "backend panicked".to_string() ),
    };

    if let Some( reason ) = failure {
        tracing::warn!( "Skipping {:?}: {}", path, reason );
        *shared.now_playing() = None;
        let delay = shared.config().loop_delay.max( shared.timing.poll_interval );
        stop.wait( delay );
        return;
    }

    tracing::info!( "Playing {:?}", path );
    *shared.now_playing() = Some( path.to_path_buf() );

    if stop.wait( shared.config().loop_delay ) {
        return;
    }

    while backend_is_playing( shared ) {
        if stop.wait( shared.timing.poll_interval ) {
            return;
        }
    }

    tracing::debug!( "Finished {:?}", path );
}


fn backend_is_playing( shared: &Shared ) -> bool {
    panic::catch_unwind( AssertUnwindSafe( || shared.backend.is_playing() ) ).unwrap_or_else( |_| {
        tracing::warn!( "Backend panicked while polling, treating item as finished" );
        false
    })
}


#[cfg( test )]
mod tests {
    use super::*;


    fn queue_of( names: &[&str] ) -> Queue {
        let mut queue = Queue::default();
        queue.replace( names.iter().map( PathBuf::from ).collect() );
        queue
    }


    #[test]
    fn test_advance_wraps_after_len_steps() {
        let mut queue = queue_of( &[ "a.mp4", "b.jpg", "c.mkv" ] );
        let start = queue.position();

        let played: Vec<_> = ( 0..3 ).filter_map( |_| queue.advance() ).collect();

        assert_eq!( played, vec![
            PathBuf::from( "a.mp4" ),
            PathBuf::from( "b.jpg" ),
            PathBuf::from( "c.mkv" ),
        ]);
        assert_eq!( queue.position(), start );
        assert_eq!( queue.advance(), Some( PathBuf::from( "a.mp4" ) ) );
    }


    #[test]
    fn test_advance_on_empty_does_not_move() {
        let mut queue = Queue::default();
        assert_eq!( queue.advance(), None );
        assert_eq!( queue.position(), 0 );
    }


    #[test]
    fn test_replace_rewinds() {
        let mut queue = queue_of( &[ "a.mp4", "b.mp4" ] );
        queue.advance();
        assert_eq!( queue.position(), 1 );

        queue.replace( vec![ PathBuf::from( "z.png" ) ] );
        assert_eq!( queue.position(), 0 );
        assert_eq!( queue.advance(), Some( PathBuf::from( "z.png" ) ) );
    }


    #[test]
    fn test_stop_signal_wakes_waiters() {
        let signal = Arc::new( StopSignal::default() );
        let waiter = {
            let signal = Arc::clone( &signal );
            thread::spawn( move || signal.wait( Duration::from_secs( 30 ) ) )
        };

        thread::sleep( Duration::from_millis( 20 ) );
        signal.set();
        assert!( waiter.join().unwrap() );
        assert!( signal.is_set() );
    }


    #[test]
    fn test_stop_signal_times_out() {
        let signal = StopSignal::default();
        assert!( !signal.wait( Duration::from_millis( 5 ) ) );
        assert!( !signal.is_set() );
    }
}
