//! Tracing subscriber setup.
//!
//! Headless mode logs to stderr. The settings surface owns the terminal,
//! so it logs to a file instead.

use std::fs::{ self, OpenOptions };
use std::path::{ Path, PathBuf };
use std::sync::Mutex;

use anyhow::{ Context, Result };
use tracing_subscriber::EnvFilter;


fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new( "info" ) )
}


/// Returns the default log file location.
pub fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .map( |d| d.join( "loopdeck" ) )
        .unwrap_or_else( std::env::temp_dir )
        .join( "loopdeck.log" )
}


/// Logs to stderr.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter( env_filter() )
        .with_writer( std::io::stderr )
        .init();
}


/// Appends logs to `path`, creating parent directories as needed.
pub fn init_file( path: &Path ) -> Result<()> {
    if let Some( parent ) = path.parent() {
        fs::create_dir_all( parent )
            .with_context( || format!( "Failed to create log directory {:?}", parent ) )?;
    }

    let file = OpenOptions::new()
        .create( true )
        .append( true )
        .open( path )
        .with_context( || format!( "Failed to open log file {:?}", path ) )?;

    tracing_subscriber::fmt()
        .with_env_filter( env_filter() )
        .with_writer( Mutex::new( file ) )
        .with_ansi( false )
        .init();

    Ok(())
}
