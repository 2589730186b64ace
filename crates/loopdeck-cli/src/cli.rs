//! Command-line argument parsing for Loopdeck.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use loopdeck_core::{ PlayerConfig, ProcessBackendOptions };


/// Loopdeck - loops a media folder on a kiosk display.
#[derive( Parser, Debug )]
#[command( name = "loopdeck" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// Run the player without the settings surface (kiosk mode).
    #[arg( long )]
    pub headless: bool,

    /// Path to the JSON configuration file.
    #[arg( short, long )]
    pub config: Option<PathBuf>,

    /// External player used to render each item (mpv-compatible).
    #[arg( long, default_value = "mpv" )]
    pub player: String,

    /// Extra argument passed to the player; repeat for several.
    #[arg( long = "player-arg", allow_hyphen_values = true )]
    pub player_args: Vec<String>,

    /// Seconds a still image stays on screen.
    #[arg( long, default_value_t = 10.0 )]
    pub image_duration: f64,

    /// Write logs to this file instead of the default location.
    #[arg( long )]
    pub log_file: Option<PathBuf>,
}


impl Args {
    /// Resolves the configuration file path.
    pub fn config_path( &self ) -> PathBuf {
        self.config.clone().unwrap_or_else( PlayerConfig::default_path )
    }


    /// Builds options for the process backend.
    ///
    /// Explicit `--player-arg` values replace the default player arguments.
    pub fn backend_options( &self ) -> ProcessBackendOptions {
        let defaults = ProcessBackendOptions::default();

        let extra_args = if self.player_args.is_empty() {
            defaults.extra_args
        } else {
            self.player_args.clone()
        };

        let image_duration = Duration::try_from_secs_f64( self.image_duration )
            .unwrap_or( defaults.image_duration );

        ProcessBackendOptions {
            program: self.player.clone(),
            extra_args,
            image_duration,
            ipc_socket: defaults.ipc_socket,
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_defaults() {
        let args = Args::parse_from( [ "loopdeck" ] );
        assert!( !args.headless );
        assert_eq!( args.player, "mpv" );
        assert!( args.player_args.is_empty() );
        assert_eq!( args.image_duration, 10.0 );
    }


    #[test]
    fn test_headless_with_player_args() {
        let args = Args::parse_from( [
            "loopdeck", "--headless", "--config", "/etc/loopdeck.json",
            "--player-arg", "--vo=gpu", "--player-arg", "--loop-file=no",
        ]);
        assert!( args.headless );
        assert_eq!( args.config_path(), PathBuf::from( "/etc/loopdeck.json" ) );
        assert_eq!( args.player_args, vec![ "--vo=gpu", "--loop-file=no" ] );
        assert_eq!( args.backend_options().extra_args, vec![ "--vo=gpu", "--loop-file=no" ] );
    }


    #[test]
    fn test_negative_image_duration_uses_default() {
        let args = Args::parse_from( [ "loopdeck", "--image-duration=-4" ] );
        let options = args.backend_options();
        assert_eq!( options.image_duration, ProcessBackendOptions::default().image_duration );
        assert_eq!( options.extra_args, ProcessBackendOptions::default().extra_args );
    }
}
