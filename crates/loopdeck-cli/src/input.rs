//! Text entry for the settings form.


/// Whether keys drive the form or edit a text field.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum InputMode {
    /// Keys move between fields and trigger actions.
    #[default]
    Normal,

    /// Keys edit the focused text field.
    Editing,
}


/// Single-line edit buffer with a byte-offset cursor.
#[derive( Debug, Default, Clone )]
pub struct InputBuffer {
    content: String,
    cursor: usize,
}


impl InputBuffer {
    /// Creates a buffer holding `content` with the cursor at the end.
    pub fn with_content( content: impl Into<String> ) -> Self {
        let content = content.into();
        let cursor = content.len();
        Self { content, cursor }
    }


    /// Replaces the content and moves the cursor to the end.
    pub fn set( &mut self, content: impl Into<String> ) {
        *self = Self::with_content( content );
    }


    /// Inserts a character at the cursor.
    pub fn insert( &mut self, c: char ) {
        self.content.insert( self.cursor, c );
        self.cursor += c.len_utf8();
    }


    /// Deletes the character before the cursor.
    pub fn backspace( &mut self ) {
        if let Some( prev ) = self.prev_boundary() {
            self.content.remove( prev );
            self.cursor = prev;
        }
    }


    /// Deletes the character under the cursor.
    pub fn delete( &mut self ) {
        if self.cursor < self.content.len() {
            self.content.remove( self.cursor );
        }
    }


    pub fn move_left( &mut self ) {
        if let Some( prev ) = self.prev_boundary() {
            self.cursor = prev;
        }
    }


    pub fn move_right( &mut self ) {
        if let Some( c ) = self.content[ self.cursor.. ].chars().next() {
            self.cursor += c.len_utf8();
        }
    }


    pub fn move_home( &mut self ) {
        self.cursor = 0;
    }


    pub fn move_end( &mut self ) {
        self.cursor = self.content.len();
    }


    /// Gets the current content.
    pub fn content( &self ) -> &str {
        &self.content
    }


    /// Gets the cursor position in characters, for display.
    pub fn cursor_char_pos( &self ) -> usize {
        self.content[ ..self.cursor ].chars().count()
    }


    fn prev_boundary( &self ) -> Option<usize> {
        self.content[ ..self.cursor ]
            .char_indices()
            .last()
            .map( |( i, _ )| i )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_edit_in_middle() {
        let mut buf = InputBuffer::with_content( "/medi" );
        buf.move_home();
        buf.move_right();
        buf.insert( 'x' );
        assert_eq!( buf.content(), "/xmedi" );

        buf.move_end();
        buf.insert( 'a' );
        assert_eq!( buf.content(), "/xmedia" );
        assert_eq!( buf.cursor_char_pos(), 7 );
    }


    #[test]
    fn test_multibyte_characters() {
        let mut buf = InputBuffer::with_content( "složka" );
        buf.move_left();
        buf.move_left();
        buf.move_left();
        buf.backspace();
        assert_eq!( buf.content(), "slžka" );
        assert_eq!( buf.cursor_char_pos(), 2 );

        buf.delete();
        assert_eq!( buf.content(), "slka" );
    }


    #[test]
    fn test_backspace_at_start_is_noop() {
        let mut buf = InputBuffer::with_content( "ab" );
        buf.move_home();
        buf.backspace();
        assert_eq!( buf.content(), "ab" );

        buf.set( "" );
        buf.delete();
        buf.move_right();
        assert_eq!( buf.content(), "" );
    }
}
