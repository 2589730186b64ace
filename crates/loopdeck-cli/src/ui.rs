//! Drawing for the settings surface.

use loopdeck_core::library::media_kind;
use loopdeck_core::RunState;
use ratatui::{
    prelude::*,
    widgets::{ Block, Borders, List, ListItem, Paragraph, Wrap },
};

use crate::app::App;
use crate::form::Field;
use crate::input::InputMode;
use crate::view::{ self, ViewMode };


/// Draws the whole screen.
pub fn draw_ui( frame: &mut Frame, app: &mut App ) {
    let chunks = Layout::default()
        .direction( Direction::Vertical )
        .constraints([
            Constraint::Length( 2 ),  // Header
            Constraint::Min( 0 ),     // Main content
            Constraint::Length( 1 ),  // Status bar
        ])
        .split( frame.area() );

    let header = Paragraph::new( format!( "  LOOPDECK - {}", app.view_mode.title() ) )
        .style( Style::default().fg( Color::Cyan ).bold() )
        .block( Block::default().borders( Borders::BOTTOM ) );
    frame.render_widget( header, chunks[0] );

    match app.view_mode {
        ViewMode::Settings => draw_settings( frame, app, chunks[1] ),
        ViewMode::FolderPicker => draw_picker( frame, app, chunks[1] ),
        ViewMode::Help => draw_help( frame, chunks[1] ),
    }

    draw_status_bar( frame, app, chunks[2] );
}


fn draw_settings( frame: &mut Frame, app: &mut App, area: Rect ) {
    let columns = Layout::default()
        .direction( Direction::Horizontal )
        .constraints([ Constraint::Percentage( 50 ), Constraint::Percentage( 50 ) ])
        .split( area );

    draw_form( frame, app, columns[0] );
    draw_playlist( frame, app, columns[1] );
}


fn draw_form( frame: &mut Frame, app: &App, area: Rect ) {
    let editing = app.input_mode == InputMode::Editing;

    let lines: Vec<Line> = Field::ALL
        .iter()
        .flat_map( |&field| {
            let focused = field == app.form.focus;
            let label_style = if focused {
                Style::default().fg( Color::Yellow ).bold()
            } else {
                Style::default()
            };
            let value_style = if focused && editing {
                Style::default().bg( Color::DarkGray )
            } else {
                Style::default().fg( Color::Green )
            };
            let marker = if focused { "> " } else { "  " };

            [
                Line::from( Span::styled( format!( "{}{}", marker, field.label() ), label_style ) ),
                Line::from( Span::styled( format!( "    {}", app.form.value_text( field ) ), value_style ) ),
            ]
        })
        .collect();

    let form = Paragraph::new( lines )
        .block( Block::default().title( " Settings " ).borders( Borders::ALL ) );
    frame.render_widget( form, area );

    if editing {
        // Two lines per field; value line of the first field sits at row 2
        let x = area.x + 5 + app.form.media_dir.cursor_char_pos() as u16;
        let y = area.y + 2;
        if x < area.right().saturating_sub( 1 ) {
            frame.set_cursor_position(( x, y ));
        }
    }
}


fn draw_playlist( frame: &mut Frame, app: &mut App, area: Rect ) {
    let items: Vec<ListItem> = app.playlist
        .iter()
        .map( |path| {
            let filename = path
                .file_name()
                .and_then( |n| n.to_str() )
                .unwrap_or( "Unknown" );
            let kind = media_kind( path ).map( |k| k.label() ).unwrap_or( "" );
            ListItem::new( format!( "{:<5} {}", kind, filename ) )
        })
        .collect();

    let state = match app.run_state {
        RunState::Idle => "stopped",
        RunState::Running if app.is_playing => "playing",
        RunState::Running => "waiting",
        RunState::Stopping => "stopping",
    };

    let title = format!( " Playlist ({}) [{}] ", app.playlist.len(), state );

    let playlist_widget = List::new( items )
        .block( Block::default().title( title ).borders( Borders::ALL ) )
        .highlight_style( Style::default().bg( Color::DarkGray ) )
        .highlight_symbol( ">> " );

    frame.render_stateful_widget( playlist_widget, area, &mut app.playlist_state );
}


fn draw_picker( frame: &mut Frame, app: &mut App, area: Rect ) {
    let Some( ref browser ) = app.browser else {
        return;
    };

    let title = format!(
        " {} ({} playable) ",
        browser.current_dir().display(),
        browser.media_count()
    );

    let items: Vec<ListItem> = browser
        .entries()
        .iter()
        .map( |entry| {
            ListItem::new( format!( " {}/", entry.name ) ).style( Style::default().fg( Color::Blue ) )
        })
        .collect();

    let list = List::new( items )
        .block( Block::default().title( title ).borders( Borders::ALL ) )
        .highlight_style( Style::default().bg( Color::DarkGray ) )
        .highlight_symbol( ">> " );

    frame.render_stateful_widget( list, area, &mut app.browser_state );
}


fn draw_help( frame: &mut Frame, area: Rect ) {
    let help = Paragraph::new( view::help_text() )
        .block( Block::default().title( " Keys " ).borders( Borders::ALL ) )
        .wrap( Wrap { trim: false } );
    frame.render_widget( help, area );
}


fn draw_status_bar( frame: &mut Frame, app: &App, area: Rect ) {
    let now_playing = app.now_playing
        .as_ref()
        .and_then( |p| p.file_name() )
        .map( |n| n.to_string_lossy().to_string() )
        .unwrap_or_else( || "-".to_string() );

    let text = format!( " {} | Now: {} | ? help ", app.status, now_playing );
    let bar = Paragraph::new( text ).style( Style::default().fg( Color::Black ).bg( Color::Cyan ) );
    frame.render_widget( bar, area );
}
