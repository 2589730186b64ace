//! Loopdeck CLI - kiosk media looper with a terminal settings surface

mod app;
mod browser;
mod cli;
mod form;
mod headless;
mod input;
mod logging;
mod ui;
mod view;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{ self, Event, KeyEventKind },
    terminal::{ disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen },
    ExecutableCommand,
};
use ratatui::prelude::*;

use loopdeck_core::{ PlaybackBackend, ProcessBackend };

use app::App;
use cli::Args;


fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config_path();

    if args.headless {
        logging::init_stderr();
        return headless::run( &config_path, args.backend_options() );
    }

    let log_file = args.log_file.clone().unwrap_or_else( logging::default_log_file );
    logging::init_file( &log_file )?;
    tracing::info!( "Settings surface using config {:?}", config_path );

    let backend: Arc<dyn PlaybackBackend> = Arc::new( ProcessBackend::new( args.backend_options() ) );
    let mut app = App::new( config_path, backend );

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute( EnterAlternateScreen )?;

    let result = run_app( &mut app );

    // Cleanup
    app.shutdown();
    disable_raw_mode()?;
    io::stdout().execute( LeaveAlternateScreen )?;

    result
}


fn run_app( app: &mut App ) -> Result<()> {
    let mut terminal = Terminal::new( CrosstermBackend::new( io::stdout() ) )?;

    loop {
        app.tick();

        terminal.draw( |frame| ui::draw_ui( frame, app ) )?;

        if event::poll( Duration::from_millis( 100 ) )? {
            if let Event::Key( key ) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key( key.code, key.modifiers );
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
