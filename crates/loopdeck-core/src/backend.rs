//! Playback backends
//!
//! The scheduler never decodes media itself. It hands each playlist item to
//! a [`PlaybackBackend`] and polls it for completion.

use std::fs;
use std::path::{ Path, PathBuf };
use std::process::{ Child, Command, Stdio };
use std::sync::atomic::{ AtomicU8, Ordering };
use std::sync::{ Mutex, MutexGuard, PoisonError };
use std::time::Duration;

use serde_json::{ json, Value };
use thiserror::Error;

use crate::config::DEFAULT_VOLUME;
use crate::library::{ media_kind, MediaKind };


/// Errors reported by a playback backend.
#[derive( Debug, Error )]
pub enum BackendError {
    #[error( "Failed to launch {program}: {source}" )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error( "IPC error: {0}" )]
    Ipc( #[from] std::io::Error ),

    #[error( "No IPC socket configured" )]
    NoIpcSocket,

    #[error( "Playback failed: {0}" )]
    Failed( String ),
}


/// Transport controls for rendering one media item at a time.
///
/// Calls must return promptly; `is_playing` should reflect near-real-time
/// state, including `false` once an item has ended or failed.
pub trait PlaybackBackend: Send + Sync {
    /// Starts rendering `path`, replacing whatever is currently playing.
    fn play( &self, path: &Path ) -> Result<(), BackendError>;

    /// Stops the current item immediately.
    fn stop( &self );

    /// Toggles pause on the current item.
    fn pause( &self );

    /// Returns true while an item is loaded and not finished (paused counts).
    fn is_playing( &self ) -> bool;

    /// Sets output volume, 0-100.
    fn set_volume( &self, volume: u8 );
}


/// Options for [`ProcessBackend`].
#[derive( Debug, Clone )]
pub struct ProcessBackendOptions {
    /// Player executable, expected to accept mpv-style options
    pub program: String,

    /// Extra arguments placed before the generated ones
    pub extra_args: Vec<String>,

    /// How long still images stay on screen
    pub image_duration: Duration,

    /// Socket path for JSON IPC (pause and live volume changes)
    pub ipc_socket: Option<PathBuf>,
}


impl Default for ProcessBackendOptions {
    fn default() -> Self {
        Self {
            program: "mpv".to_string(),
            extra_args: vec![ "--fullscreen".to_string(), "--no-terminal".to_string() ],
            image_duration: Duration::from_secs( 10 ),
            ipc_socket: default_ipc_socket(),
        }
    }
}


#[cfg( unix )]
fn default_ipc_socket() -> Option<PathBuf> {
    Some( std::env::temp_dir().join( format!( "loopdeck-{}.sock", std::process::id() ) ) )
}


#[cfg( not( unix ) )]
fn default_ipc_socket() -> Option<PathBuf> {
    None
}


/// Renders items by running an external player process per item.
pub struct ProcessBackend {
    options: ProcessBackendOptions,
    child: Mutex<Option<Child>>,
    volume: AtomicU8,
}


impl ProcessBackend {
    /// Creates a backend; nothing is launched until `play`.
    pub fn new( options: ProcessBackendOptions ) -> Self {
        Self {
            options,
            child: Mutex::new( None ),
            volume: AtomicU8::new( DEFAULT_VOLUME ),
        }
    }


    /// Builds the command line for one item.
    pub fn command_for( &self, path: &Path ) -> Command {
        let mut cmd = Command::new( &self.options.program );
        cmd.args( &self.options.extra_args );
        cmd.arg( format!( "--volume={}", self.volume.load( Ordering::Relaxed ) ) );

        if media_kind( path ) == Some( MediaKind::Image ) {
            cmd.arg( format!(
                "--image-display-duration={}",
                self.options.image_duration.as_secs_f64()
            ));
        }

        if let Some( ref socket ) = self.options.ipc_socket {
            cmd.arg( format!( "--input-ipc-server={}", socket.display() ) );
        }

        cmd.arg( "--" ).arg( path );
        cmd.stdin( Stdio::null() ).stdout( Stdio::null() ).stderr( Stdio::null() );
        cmd
    }


    fn child( &self ) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else( PoisonError::into_inner )
    }


    fn kill_current( child: &mut Option<Child> ) {
        if let Some( mut process ) = child.take() {
            if let Err( e ) = process.kill() {
                // InvalidInput means the process already exited
                if e.kind() != std::io::ErrorKind::InvalidInput {
                    tracing::warn!( "Failed to kill player process: {}", e );
                }
            }
            let _ = process.wait();
        }
    }


    /// Sends one JSON IPC command to the running player.
    #[cfg( unix )]
    fn send_ipc( &self, command: Value ) -> Result<(), BackendError> {
        use std::io::Write;
        use std::os::unix::net::UnixStream;

        let socket = self.options.ipc_socket.as_ref().ok_or( BackendError::NoIpcSocket )?;
        let mut stream = UnixStream::connect( socket )?;
        stream.set_write_timeout( Some( Duration::from_millis( 200 ) ) )?;

        let mut line = json!({ "command": command }).to_string();
        line.push( '\n' );
        stream.write_all( line.as_bytes() )?;
        Ok(())
    }


    #[cfg( not( unix ) )]
    fn send_ipc( &self, _command: Value ) -> Result<(), BackendError> {
        Err( BackendError::NoIpcSocket )
    }
}


impl PlaybackBackend for ProcessBackend {
    fn play( &self, path: &Path ) -> Result<(), BackendError> {
        let mut child = self.child();
        Self::kill_current( &mut child );

        let process = self.command_for( path )
            .spawn()
            .map_err( |source| BackendError::Spawn {
                program: self.options.program.clone(),
                source,
            })?;

        tracing::debug!( "Launched {} (pid {}) for {:?}", self.options.program, process.id(), path );
        *child = Some( process );
        Ok(())
    }


    fn stop( &self ) {
        Self::kill_current( &mut self.child() );
    }


    fn pause( &self ) {
        if !self.is_playing() {
            return;
        }
        if let Err( e ) = self.send_ipc( json!([ "cycle", "pause" ]) ) {
            tracing::warn!( "Pause not delivered: {}", e );
        }
    }


    fn is_playing( &self ) -> bool {
        let mut child = self.child();
        let Some( process ) = child.as_mut() else {
            return false;
        };

        match process.try_wait() {
            Ok( None ) => true,
            Ok( Some( status ) ) => {
                tracing::debug!( "Player process exited: {}", status );
                *child = None;
                false
            }
            Err( e ) => {
                tracing::warn!( "Failed to query player process: {}", e );
                *child = None;
                false
            }
        }
    }


    fn set_volume( &self, volume: u8 ) {
        self.volume.store( volume, Ordering::Relaxed );

        // New volume always applies to the next launch
        if self.is_playing() {
            if let Err( e ) = self.send_ipc( json!([ "set_property", "volume", volume ]) ) {
                tracing::debug!( "Live volume change not delivered: {}", e );
            }
        }
    }
}


impl Drop for ProcessBackend {
    fn drop( &mut self ) {
        Self::kill_current( &mut self.child() );

        // A killed player leaves its socket file behind
        if let Some( ref socket ) = self.options.ipc_socket {
            match fs::remove_file( socket ) {
                Ok(()) => tracing::debug!( "Removed IPC socket {:?}", socket ),
                Err( e ) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err( e ) => tracing::warn!( "Failed to remove IPC socket {:?}: {}", socket, e ),
            }
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use std::ffi::OsStr;


    fn args_of( cmd: &Command ) -> Vec<String> {
        cmd.get_args().map( |a| a.to_string_lossy().to_string() ).collect()
    }


    #[test]
    fn test_command_for_video() {
        let backend = ProcessBackend::new( ProcessBackendOptions {
            program: "mpv".into(),
            extra_args: vec![ "--fullscreen".into() ],
            image_duration: Duration::from_secs( 5 ),
            ipc_socket: None,
        });
        backend.set_volume( 55 );

        let cmd = backend.command_for( Path::new( "/media/a.mp4" ) );
        assert_eq!( cmd.get_program(), OsStr::new( "mpv" ) );
        assert_eq!( args_of( &cmd ), vec![ "--fullscreen", "--volume=55", "--", "/media/a.mp4" ] );
    }


    #[test]
    fn test_command_for_image_sets_duration() {
        let backend = ProcessBackend::new( ProcessBackendOptions {
            program: "mpv".into(),
            extra_args: Vec::new(),
            image_duration: Duration::from_millis( 2500 ),
            ipc_socket: Some( PathBuf::from( "/tmp/ld.sock" ) ),
        });

        let args = args_of( &backend.command_for( Path::new( "slide.PNG" ) ) );
        assert!( args.contains( &"--image-display-duration=2.5".to_string() ) );
        assert!( args.contains( &"--input-ipc-server=/tmp/ld.sock".to_string() ) );
    }


    #[test]
    fn test_missing_program_is_spawn_error() {
        let backend = ProcessBackend::new( ProcessBackendOptions {
            program: "loopdeck-no-such-player".into(),
            extra_args: Vec::new(),
            image_duration: Duration::from_secs( 1 ),
            ipc_socket: None,
        });

        let result = backend.play( Path::new( "a.mp4" ) );
        assert!( matches!( result, Err( BackendError::Spawn { .. } ) ) );
        assert!( !backend.is_playing() );
    }


    #[test]
    fn test_idle_controls_are_noops() {
        let backend = ProcessBackend::new( ProcessBackendOptions::default() );
        backend.stop();
        backend.pause();
        assert!( !backend.is_playing() );
    }


    #[test]
    fn test_drop_removes_ipc_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join( "player.sock" );
        fs::write( &socket, b"" ).unwrap();

        let backend = ProcessBackend::new( ProcessBackendOptions {
            ipc_socket: Some( socket.clone() ),
            ..ProcessBackendOptions::default()
        });
        drop( backend );

        assert!( !socket.exists() );
    }
}
