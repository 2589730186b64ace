//! Player configuration
//!
//! Loads and saves the five playback settings as a JSON file. Loading never
//! fails: a missing or broken file yields defaults, and each field that is
//! absent or malformed falls back to its own default.

use std::fs;
use std::path::{ Path, PathBuf };
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{ Deserialize, Deserializer, Serialize, Serializer };
use serde_json::Value;
use thiserror::Error;


/// Default grace period between issuing play and polling for completion.
pub const DEFAULT_LOOP_DELAY: Duration = Duration::from_millis( 200 );

/// Default output volume (0-100).
pub const DEFAULT_VOLUME: u8 = 80;

/// Highest accepted volume.
pub const MAX_VOLUME: u8 = 100;


/// Errors that can occur while saving configuration.
#[derive( Debug, Error )]
pub enum ConfigError {
    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Serialization failed: {0}" )]
    Serialize( #[from] serde_json::Error ),
}


/// Playback settings.
#[derive( Debug, Clone, PartialEq, Serialize )]
pub struct PlayerConfig {
    /// Folder scanned for playable files
    pub media_dir: PathBuf,

    /// Start playback as soon as the settings surface opens
    pub autoplay: bool,

    /// Randomize playlist order on every rebuild
    pub shuffle: bool,

    /// Output volume, 0-100
    pub volume: u8,

    /// Grace period after starting an item, stored as fractional seconds
    #[serde( serialize_with = "serialize_secs" )]
    pub loop_delay: Duration,
}


impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from( "media" ),
            autoplay: true,
            shuffle: false,
            volume: DEFAULT_VOLUME,
            loop_delay: DEFAULT_LOOP_DELAY,
        }
    }
}


impl PlayerConfig {
    /// Returns the default configuration file location.
    ///
    /// `<config dir>/loopdeck/config.json`, or `config.json` in the working
    /// directory when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map( |p| p.join( "loopdeck" ).join( "config.json" ) )
            .unwrap_or_else( || PathBuf::from( "config.json" ) )
    }


    /// Loads configuration from `path`, or returns defaults if not usable.
    pub fn load( path: &Path ) -> Self {
        if !path.exists() {
            tracing::info!( "No config at {:?}, using defaults", path );
            return Self::default();
        }

        let contents = match fs::read_to_string( path ) {
            Ok( c ) => c,
            Err( e ) => {
                tracing::warn!( "Failed to read config {:?}: {}", path, e );
                return Self::default();
            }
        };

        match serde_json::from_str::<Value>( &contents ) {
            Ok( value @ Value::Object( _ ) ) => serde_json::from_value( value ).unwrap_or_else( |e| {
                tracing::warn!( "Unusable config {:?}: {}", path, e );
                Self::default()
            }),
            Ok( _ ) => {
                tracing::warn!( "Config {:?} is not a JSON object, using defaults", path );
                Self::default()
            }
            Err( e ) => {
                tracing::warn!( "Malformed config {:?}: {}", path, e );
                Self::default()
            }
        }
    }


    /// Saves configuration to `path` as pretty-printed JSON.
    pub fn save( &self, path: &Path ) -> Result<(), ConfigError> {
        if let Some( parent ) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all( parent )?;
            }
        }

        let mut json = serde_json::to_string_pretty( self )?;
        json.push( '\n' );
        fs::write( path, json )?;

        tracing::debug!( "Saved config to {:?}", path );
        Ok(())
    }
}


impl<'de> Deserialize<'de> for PlayerConfig {
    fn deserialize<D: Deserializer<'de>>( deserializer: D ) -> Result<Self, D::Error> {
        RawConfig::deserialize( deserializer ).map( Self::from )
    }
}


/// Config as written on disk. Absent or mistyped fields read as `None`.
#[derive( Debug, Default, Deserialize )]
#[serde( default )]
struct RawConfig {
    #[serde( deserialize_with = "lenient" )]
    media_dir: Option<PathBuf>,

    #[serde( deserialize_with = "lenient" )]
    autoplay: Option<bool>,

    #[serde( deserialize_with = "lenient" )]
    shuffle: Option<bool>,

    #[serde( deserialize_with = "lenient" )]
    volume: Option<f64>,

    /// Seconds
    #[serde( deserialize_with = "lenient" )]
    loop_delay: Option<f64>,
}


impl From<RawConfig> for PlayerConfig {
    fn from( raw: RawConfig ) -> Self {
        let defaults = Self::default();

        let volume = raw.volume
            .filter( |v| v.is_finite() )
            .map( |v| clamp_volume( v.round() as i64 ) )
            .unwrap_or( defaults.volume );

        let loop_delay = raw.loop_delay
            .filter( |secs| secs.is_finite() && *secs >= 0.0 )
            .and_then( |secs| Duration::try_from_secs_f64( secs ).ok() )
            .unwrap_or( defaults.loop_delay );

        Self {
            media_dir: raw.media_dir.unwrap_or( defaults.media_dir ),
            autoplay: raw.autoplay.unwrap_or( defaults.autoplay ),
            shuffle: raw.shuffle.unwrap_or( defaults.shuffle ),
            volume,
            loop_delay,
        }
    }
}


/// Reads a field as `T`, or `None` if the value has the wrong type.
fn lenient<'de, D, T>( deserializer: D ) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize( deserializer )?;
    Ok( serde_json::from_value( value ).ok() )
}


/// Clamps an arbitrary integer volume into 0-100.
pub fn clamp_volume( volume: i64 ) -> u8 {
    volume.clamp( 0, MAX_VOLUME as i64 ) as u8
}


fn serialize_secs<S: Serializer>( value: &Duration, serializer: S ) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64( value.as_secs_f64() )
}


#[cfg( test )]
mod tests {
    use super::*;

    use serde_json::json;


    fn parse( value: Value ) -> PlayerConfig {
        serde_json::from_value( value ).unwrap()
    }


    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlayerConfig::load( &dir.path().join( "nope.json" ) );
        assert_eq!( config, PlayerConfig::default() );
    }


    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "config.json" );
        fs::write( &path, "{ this is not json" ).unwrap();

        assert_eq!( PlayerConfig::load( &path ), PlayerConfig::default() );
    }


    #[test]
    fn test_bad_field_falls_back_alone() {
        let config = parse( json!({
            "media_dir": "/srv/media",
            "shuffle": "yes",
            "volume": 35,
            "loop_delay": -1.0,
            "unknown": 12,
        }));

        assert_eq!( config.media_dir, PathBuf::from( "/srv/media" ) );
        assert!( !config.shuffle );
        assert!( config.autoplay );
        assert_eq!( config.volume, 35 );
        assert_eq!( config.loop_delay, DEFAULT_LOOP_DELAY );
    }


    #[test]
    fn test_null_and_mistyped_fields_use_defaults() {
        let config = parse( json!({
            "media_dir": null,
            "autoplay": 0,
            "volume": "loud",
            "loop_delay": 0.5,
        }));

        assert_eq!( config.media_dir, PathBuf::from( "media" ) );
        assert!( config.autoplay );
        assert_eq!( config.volume, DEFAULT_VOLUME );
        assert_eq!( config.loop_delay, Duration::from_millis( 500 ) );
    }


    #[test]
    fn test_non_object_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "config.json" );
        fs::write( &path, r#"[ "/srv/media", false ]"# ).unwrap();

        assert_eq!( PlayerConfig::load( &path ), PlayerConfig::default() );
    }


    #[test]
    fn test_volume_is_clamped() {
        let loud = parse( json!({ "volume": 250 }) );
        let negative = parse( json!({ "volume": -3 }) );
        assert_eq!( loud.volume, 100 );
        assert_eq!( negative.volume, 0 );
    }


    #[test]
    fn test_save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "nested" ).join( "config.json" );

        let config = PlayerConfig {
            media_dir: PathBuf::from( "/mnt/usb" ),
            autoplay: false,
            shuffle: true,
            volume: 42,
            loop_delay: Duration::from_millis( 1500 ),
        };
        config.save( &path ).unwrap();

        let written = fs::read_to_string( &path ).unwrap();
        assert!( written.contains( "\"loop_delay\": 1.5" ) );
        assert!( written.ends_with( '\n' ) );

        assert_eq!( PlayerConfig::load( &path ), config );
    }
}
