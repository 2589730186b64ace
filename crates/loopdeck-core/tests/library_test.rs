//! Playlist building against real folders.

use std::collections::HashSet;
use std::fs;
use std::path::{ Path, PathBuf };

use loopdeck_core::build_playlist;
use loopdeck_core::library::is_supported;


fn touch( dir: &Path, names: &[&str] ) {
    for name in names {
        fs::write( dir.join( name ), b"x" ).unwrap();
    }
}


fn names( items: &[PathBuf] ) -> Vec<String> {
    items
        .iter()
        .map( |p| p.file_name().unwrap().to_string_lossy().to_string() )
        .collect()
}


#[test]
fn test_keeps_only_supported_files() {
    let dir = tempfile::tempdir().unwrap();
    touch( dir.path(), &[
        "intro.mp4", "loop.MOV", "old.avi", "film.mkv",
        "jingle.mp3", "tone.wav", "master.FLAC",
        "a.jpg", "b.jpeg", "c.png", "d.bmp",
    ]);
    touch( dir.path(), &[ "notes.txt", "cover.gif", "track.ogg", "Makefile", ".hidden" ] );
    fs::create_dir( dir.path().join( "sub" ) ).unwrap();
    touch( &dir.path().join( "sub" ), &[ "nested.mp4" ] );

    let items = build_playlist( dir.path(), false );

    assert_eq!( items.len(), 11 );
    assert!( items.iter().all( |p| is_supported( p ) ) );
    assert!( items.iter().all( |p| p.parent() == Some( dir.path() ) ) );
}


#[test]
fn test_missing_folder_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join( "gone" );

    assert!( build_playlist( &missing, false ).is_empty() );
    assert!( build_playlist( &missing, true ).is_empty() );
}


#[test]
fn test_file_instead_of_folder_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    touch( dir.path(), &[ "clip.mp4" ] );

    assert!( build_playlist( &dir.path().join( "clip.mp4" ), false ).is_empty() );
}


#[test]
fn test_unshuffled_order_is_by_name() {
    let dir = tempfile::tempdir().unwrap();
    touch( dir.path(), &[ "c.mkv", "a.mp4", "b.jpg" ] );

    let first = build_playlist( dir.path(), false );
    let second = build_playlist( dir.path(), false );

    assert_eq!( names( &first ), vec![ "a.mp4", "b.jpg", "c.mkv" ] );
    assert_eq!( first, second );
}


#[test]
fn test_shuffle_changes_order_but_not_items() {
    let dir = tempfile::tempdir().unwrap();
    let files = [ "01.mp4", "02.mp4", "03.mp4", "04.png", "05.mp3", "06.wav" ];
    touch( dir.path(), &files );

    let sorted = build_playlist( dir.path(), false );
    let expected: HashSet<_> = sorted.iter().cloned().collect();

    let mut saw_different_order = false;
    for _ in 0..50 {
        let shuffled = build_playlist( dir.path(), true );
        assert_eq!( shuffled.len(), sorted.len() );
        assert_eq!( shuffled.iter().cloned().collect::<HashSet<_>>(), expected );
        if shuffled != sorted {
            saw_different_order = true;
        }
    }

    assert!( saw_different_order );
}
