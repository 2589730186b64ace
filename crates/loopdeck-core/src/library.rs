//! Media folder scanning
//!
//! Discovers playable files in the configured media folder and orders
//! them into a playlist.

use std::io::ErrorKind;
use std::path::{ Path, PathBuf };

use rand::seq::SliceRandom;


/// Supported video file extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &[ "mp4", "mov", "avi", "mkv" ];

/// Supported audio file extensions.
pub const AUDIO_EXTENSIONS: &[&str] = &[ "mp3", "wav", "flac" ];

/// Supported still image extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &[ "jpg", "jpeg", "png", "bmp" ];


/// Broad category of a playable file.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}


impl MediaKind {
    /// Short label for display.
    pub fn label( &self ) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        }
    }
}


/// Classifies a path by its extension (case-insensitive).
pub fn media_kind( path: &Path ) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let ext = ext.as_str();

    if VIDEO_EXTENSIONS.contains( &ext ) {
        Some( MediaKind::Video )
    } else if AUDIO_EXTENSIONS.contains( &ext ) {
        Some( MediaKind::Audio )
    } else if IMAGE_EXTENSIONS.contains( &ext ) {
        Some( MediaKind::Image )
    } else {
        None
    }
}


/// Checks if a file has a supported media extension.
pub fn is_supported( path: &Path ) -> bool {
    media_kind( path ).is_some()
}


/// Builds a playlist from the files directly inside `media_dir`.
///
/// Entries are sorted by file name, then shuffled when `shuffle` is set.
/// A missing or unreadable folder yields an empty playlist.
pub fn build_playlist( media_dir: &Path, shuffle: bool ) -> Vec<PathBuf> {
    let mut items = scan_media_dir( media_dir );
    items.sort_by( |a, b| a.file_name().cmp( &b.file_name() ) );

    if shuffle {
        items.shuffle( &mut rand::thread_rng() );
    }

    tracing::info!( "Playlist built from {:?}: {} items", media_dir, items.len() );
    items
}


fn scan_media_dir( dir: &Path ) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir( dir ) {
        Ok( e ) => e,
        Err( e ) if e.kind() == ErrorKind::NotFound => {
            tracing::info!( "Media folder does not exist: {:?}", dir );
            return Vec::new();
        }
        Err( e ) => {
            tracing::warn!( "Cannot read media folder {:?}: {}", dir, e );
            return Vec::new();
        }
    };

    entries
        .flatten()
        .map( |entry| entry.path() )
        .filter( |path| path.is_file() && is_supported( path ) )
        .collect()
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_media_kind_is_case_insensitive() {
        assert_eq!( media_kind( Path::new( "clip.MP4" ) ), Some( MediaKind::Video ) );
        assert_eq!( media_kind( Path::new( "song.Flac" ) ), Some( MediaKind::Audio ) );
        assert_eq!( media_kind( Path::new( "slide.JPEG" ) ), Some( MediaKind::Image ) );
    }


    #[test]
    fn test_unsupported_extensions() {
        assert!( !is_supported( Path::new( "notes.txt" ) ) );
        assert!( !is_supported( Path::new( "track.ogg" ) ) );
        assert!( !is_supported( Path::new( "README" ) ) );
    }


    #[test]
    fn test_missing_dir_is_empty() {
        let items = build_playlist( Path::new( "/definitely/not/a/media/folder" ), false );
        assert!( items.is_empty() );
    }


    #[test]
    fn test_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in [ "c.mkv", "a.mp4", "b.jpg" ] {
            std::fs::write( dir.path().join( name ), b"" ).unwrap();
        }

        let names: Vec<_> = build_playlist( dir.path(), false )
            .iter()
            .map( |p| p.file_name().unwrap().to_string_lossy().to_string() )
            .collect();

        assert_eq!( names, vec![ "a.mp4", "b.jpg", "c.mkv" ] );
    }


    #[test]
    fn test_skips_directories_with_media_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir( dir.path().join( "folder.mp4" ) ).unwrap();
        std::fs::write( dir.path().join( "real.mp4" ), b"" ).unwrap();

        let items = build_playlist( dir.path(), false );
        assert_eq!( items, vec![ dir.path().join( "real.mp4" ) ] );
    }
}
