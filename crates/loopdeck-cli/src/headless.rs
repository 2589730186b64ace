//! Headless kiosk mode.
//!
//! Loads the configuration, starts the loop, and blocks until Ctrl+C.

use std::path::Path;
use std::sync::Arc;

use anyhow::{ Context, Result };
use loopdeck_core::{ PlaybackBackend, PlayerConfig, ProcessBackend, ProcessBackendOptions, Scheduler };


/// Runs the player until interrupted.
pub fn run( config_path: &Path, options: ProcessBackendOptions ) -> Result<()> {
    let config = PlayerConfig::load( config_path );

    // Write back so a first run leaves an editable file with every field
    if let Err( e ) = config.save( config_path ) {
        tracing::warn!( "Failed to write config {:?}: {}", config_path, e );
    }

    tracing::info!(
        "Looping {:?} (shuffle: {}, volume: {})",
        config.media_dir,
        config.shuffle,
        config.volume
    );

    let backend: Arc<dyn PlaybackBackend> = Arc::new( ProcessBackend::new( options ) );
    let scheduler = Scheduler::new( config, backend );
    scheduler.start().context( "Failed to start playback" )?;

    eprintln!( "Loopdeck is running. Press Ctrl+C to quit." );
    wait_for_interrupt()?;

    tracing::info!( "Interrupted, shutting down" );
    scheduler.stop();
    Ok(())
}


fn wait_for_interrupt() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context( "Failed to build signal runtime" )?;

    runtime
        .block_on( tokio::signal::ctrl_c() )
        .context( "Failed to listen for Ctrl+C" )
}
