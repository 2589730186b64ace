//! Folder picker for choosing the media folder.
//!
//! Lists subdirectories of the current folder and counts the playable
//! files in it, so the user can see what a choice would loop.

use std::fs;
use std::path::{ Path, PathBuf };

use loopdeck_core::library::is_supported;


/// A directory in the picker listing.
#[derive( Debug, Clone )]
pub struct FolderEntry {
    pub path: PathBuf,
    pub name: String,
}


/// Folder picker state.
#[derive( Debug )]
pub struct FolderBrowser {
    current_dir: PathBuf,
    entries: Vec<FolderEntry>,
    media_count: usize,
    selected: usize,
}


impl FolderBrowser {
    /// Opens the picker at `start`, or at the nearest existing ancestor.
    pub fn open( start: &Path ) -> Self {
        let start = if start.is_absolute() {
            start.to_path_buf()
        } else {
            std::env::current_dir().unwrap_or_default().join( start )
        };

        let current_dir = start
            .ancestors()
            .find( |p| p.is_dir() )
            .map( Path::to_path_buf )
            .or_else( dirs::home_dir )
            .unwrap_or_else( || PathBuf::from( "/" ) );

        let mut browser = Self {
            current_dir,
            entries: Vec::new(),
            media_count: 0,
            selected: 0,
        };
        browser.refresh();
        browser
    }


    /// Re-reads the current folder.
    pub fn refresh( &mut self ) {
        self.entries.clear();
        self.media_count = 0;
        self.selected = 0;

        if let Some( parent ) = self.current_dir.parent() {
            self.entries.push( FolderEntry {
                path: parent.to_path_buf(),
                name: "..".to_string(),
            });
        }

        let mut folders = Vec::new();

        match fs::read_dir( &self.current_dir ) {
            Ok( entries ) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    let name = entry.file_name().to_string_lossy().to_string();

                    if path.is_dir() {
                        if !name.starts_with( '.' ) {
                            folders.push( FolderEntry { path, name } );
                        }
                    } else if is_supported( &path ) {
                        self.media_count += 1;
                    }
                }
            }
            Err( e ) => tracing::warn!( "Failed to list {:?}: {}", self.current_dir, e ),
        }

        folders.sort_by_key( |f| f.name.to_lowercase() );
        self.entries.extend( folders );
    }


    /// Enters the selected folder.
    pub fn enter_selected( &mut self ) {
        if let Some( entry ) = self.entries.get( self.selected ) {
            self.current_dir = entry.path.clone();
            self.refresh();
        }
    }


    /// Goes up to the parent folder.
    pub fn go_up( &mut self ) {
        if let Some( parent ) = self.current_dir.parent() {
            self.current_dir = parent.to_path_buf();
            self.refresh();
        }
    }


    pub fn select_next( &mut self ) {
        if !self.entries.is_empty() {
            self.selected = ( self.selected + 1 ) % self.entries.len();
        }
    }


    pub fn select_previous( &mut self ) {
        if !self.entries.is_empty() {
            self.selected = self.selected.checked_sub( 1 ).unwrap_or( self.entries.len() - 1 );
        }
    }


    /// Gets the listed folders.
    pub fn entries( &self ) -> &[FolderEntry] {
        &self.entries
    }


    /// Gets the selected index for UI state.
    pub fn selected_index( &self ) -> usize {
        self.selected
    }


    /// Gets the folder being browsed.
    pub fn current_dir( &self ) -> &Path {
        &self.current_dir
    }


    /// Number of playable files directly in the current folder.
    pub fn media_count( &self ) -> usize {
        self.media_count
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn sample_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir( dir.path().join( "Videos" ) ).unwrap();
        fs::create_dir( dir.path().join( "audio" ) ).unwrap();
        fs::create_dir( dir.path().join( ".cache" ) ).unwrap();
        fs::write( dir.path().join( "a.mp4" ), b"" ).unwrap();
        fs::write( dir.path().join( "b.png" ), b"" ).unwrap();
        fs::write( dir.path().join( "notes.txt" ), b"" ).unwrap();
        dir
    }


    #[test]
    fn test_lists_visible_folders_and_counts_media() {
        let tree = sample_tree();
        let browser = FolderBrowser::open( tree.path() );

        let names: Vec<_> = browser.entries().iter().map( |e| e.name.as_str() ).collect();
        assert_eq!( names, vec![ "..", "audio", "Videos" ] );
        assert_eq!( browser.media_count(), 2 );
    }


    #[test]
    fn test_missing_start_opens_nearest_ancestor() {
        let tree = sample_tree();
        let browser = FolderBrowser::open( &tree.path().join( "gone" ).join( "deeper" ) );
        assert_eq!( browser.current_dir(), tree.path() );
    }


    #[test]
    fn test_enter_and_go_up() {
        let tree = sample_tree();
        let mut browser = FolderBrowser::open( tree.path() );

        browser.select_next();
        browser.enter_selected();
        assert_eq!( browser.current_dir(), tree.path().join( "audio" ) );
        assert_eq!( browser.media_count(), 0 );

        browser.go_up();
        assert_eq!( browser.current_dir(), tree.path() );
    }


    #[test]
    fn test_selection_wraps() {
        let tree = sample_tree();
        let mut browser = FolderBrowser::open( tree.path() );

        browser.select_previous();
        assert_eq!( browser.selected_index(), 2 );
        browser.select_next();
        assert_eq!( browser.selected_index(), 0 );
    }
}
