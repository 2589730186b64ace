//! Settings form model.
//!
//! Holds the edited values separately from the live configuration until
//! the user saves or starts playback.

use std::path::PathBuf;
use std::time::Duration;

use loopdeck_core::PlayerConfig;

use crate::input::InputBuffer;


/// Volume change per key press.
const VOLUME_STEP: i32 = 5;

/// Loop delay slider step and upper bound, in milliseconds.
const DELAY_STEP_MS: i64 = 100;
const DELAY_MAX_MS: i64 = 2000;


/// Editable form field.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum Field {
    #[default]
    MediaDir,
    Autoplay,
    Shuffle,
    Volume,
    LoopDelay,
}


impl Field {
    pub const ALL: [Field; 5] = [
        Field::MediaDir,
        Field::Autoplay,
        Field::Shuffle,
        Field::Volume,
        Field::LoopDelay,
    ];


    fn index( self ) -> usize {
        Self::ALL.iter().position( |f| *f == self ).unwrap_or( 0 )
    }


    pub fn next( self ) -> Self {
        Self::ALL[ ( self.index() + 1 ) % Self::ALL.len() ]
    }


    pub fn previous( self ) -> Self {
        Self::ALL[ ( self.index() + Self::ALL.len() - 1 ) % Self::ALL.len() ]
    }


    pub fn label( self ) -> &'static str {
        match self {
            Field::MediaDir => "Media folder",
            Field::Autoplay => "Autoplay on start",
            Field::Shuffle => "Shuffle",
            Field::Volume => "Volume",
            Field::LoopDelay => "Delay between items",
        }
    }
}


/// Values being edited on the settings screen.
#[derive( Debug, Clone )]
pub struct SettingsForm {
    pub media_dir: InputBuffer,
    pub autoplay: bool,
    pub shuffle: bool,
    pub volume: u8,
    pub loop_delay: Duration,
    pub focus: Field,
}


impl SettingsForm {
    pub fn from_config( config: &PlayerConfig ) -> Self {
        Self {
            media_dir: InputBuffer::with_content( config.media_dir.to_string_lossy() ),
            autoplay: config.autoplay,
            shuffle: config.shuffle,
            volume: config.volume,
            loop_delay: config.loop_delay,
            focus: Field::default(),
        }
    }


    pub fn to_config( &self ) -> PlayerConfig {
        PlayerConfig {
            media_dir: PathBuf::from( self.media_dir.content().trim() ),
            autoplay: self.autoplay,
            shuffle: self.shuffle,
            volume: self.volume,
            loop_delay: self.loop_delay,
        }
    }


    /// Changes the focused value by `steps` (toggles booleans).
    pub fn adjust( &mut self, steps: i32 ) {
        match self.focus {
            Field::MediaDir => {}
            Field::Autoplay => self.autoplay = !self.autoplay,
            Field::Shuffle => self.shuffle = !self.shuffle,
            Field::Volume => {
                let volume = i32::from( self.volume ) + steps * VOLUME_STEP;
                self.volume = volume.clamp( 0, 100 ) as u8;
            }
            Field::LoopDelay => {
                let tenths = self.loop_delay.as_millis() as i64 / DELAY_STEP_MS + i64::from( steps );
                let millis = ( tenths * DELAY_STEP_MS ).clamp( 0, DELAY_MAX_MS );
                self.loop_delay = Duration::from_millis( millis as u64 );
            }
        }
    }


    /// Display text for a field's value.
    pub fn value_text( &self, field: Field ) -> String {
        let check = |on: bool| String::from( if on { "[x]" } else { "[ ]" } );

        match field {
            Field::MediaDir => self.media_dir.content().to_string(),
            Field::Autoplay => check( self.autoplay ),
            Field::Shuffle => check( self.shuffle ),
            Field::Volume => format!( "{:>3}%", self.volume ),
            Field::LoopDelay => format!( "{:.1} s", self.loop_delay.as_secs_f64() ),
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_focus_cycles() {
        assert_eq!( Field::LoopDelay.next(), Field::MediaDir );
        assert_eq!( Field::MediaDir.previous(), Field::LoopDelay );
        assert_eq!( Field::Autoplay.next(), Field::Shuffle );
    }


    #[test]
    fn test_volume_adjust_clamps() {
        let mut form = SettingsForm::from_config( &PlayerConfig::default() );
        form.focus = Field::Volume;

        form.adjust( 10 );
        assert_eq!( form.volume, 100 );
        form.adjust( -30 );
        assert_eq!( form.volume, 0 );
        form.adjust( 1 );
        assert_eq!( form.value_text( Field::Volume ), "  5%" );
    }


    #[test]
    fn test_delay_steps_in_tenths() {
        let mut form = SettingsForm::from_config( &PlayerConfig::default() );
        form.focus = Field::LoopDelay;

        form.adjust( 3 );
        assert_eq!( form.loop_delay, Duration::from_millis( 500 ) );
        form.adjust( 100 );
        assert_eq!( form.loop_delay, Duration::from_secs( 2 ) );
        form.adjust( -100 );
        assert_eq!( form.value_text( Field::LoopDelay ), "0.0 s" );
    }


    #[test]
    fn test_round_trips_config() {
        let config = PlayerConfig {
            media_dir: PathBuf::from( "/srv/kiosk" ),
            autoplay: false,
            shuffle: true,
            volume: 64,
            loop_delay: Duration::from_millis( 700 ),
        };

        let mut form = SettingsForm::from_config( &config );
        assert_eq!( form.to_config(), config );

        form.focus = Field::Shuffle;
        form.adjust( 1 );
        assert!( !form.to_config().shuffle );
    }
}
