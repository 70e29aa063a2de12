use std::fmt::{self, Display, Formatter};

/// The location in the source code where a token was found.  This structure is used all over the
/// interpreter to keep track where important things are found in the source code.  This is used
/// extensively in the error reporting.
///
/// This is a read-only structure.  Use the field accessor methods to get the values.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Either the path to the file or a description of the source code.  For example code entered
    /// in the REPL will have a name of "\<repl\>".
    source_name: String,

    /// The 1 based line number in the source code where the token was found.
    line: usize,

    /// The 1 based column number in the source code where the token was found.
    column: usize,

    /// The 0 based byte offset of the token within the source text.
    offset: usize,
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::new()
    }
}

/// Used for error reporting to show where in the source code an error originated.
impl Display for SourceLocation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(formatter, "{} ({}, {})", self.source_name, self.line, self.column)
    }
}

impl SourceLocation {
    /// Crate a new SourceLocation with default values.
    pub fn new() -> SourceLocation {
        SourceLocation {
            source_name: "unspecified".to_string(),
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Create a new SourceLocation with the name of, or a meaningful tag for the source code.
    pub fn new_from_name(source_name: &str) -> Self {
        SourceLocation {
            source_name: source_name.to_owned(),
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Create a new SourceLocation with all of the needed information.  This is useful in
    /// conjunction with the location_here! macro.
    pub fn new_from_info(source_name: &str, line: usize, column: usize, offset: usize) -> Self {
        SourceLocation {
            source_name: source_name.to_owned(),
            line,
            column,
            offset,
        }
    }

    /// The path to the source code or a meaningful description of the source code.
    pub fn source_name(&self) -> &String {
        &self.source_name
    }

    /// The 1 based line number in the source code.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The 1 based column number in the source code.
    pub fn column(&self) -> usize {
        self.column
    }

    /// The 0 based byte offset within the source code.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Helper macro to get the location of the macro invocation.  This is useful for error reporting
/// that includes locations within the Rust code where important operations are occurring.
#[macro_export]
macro_rules! location_here {
    () => {
        $crate::lang::source_buffer::SourceLocation::new_from_info(
            file!(),
            line!() as usize,
            column!() as usize,
            0,
        )
    };
}

/// A buffer for processing source code.  This is used by the tokenizer to extract meaningful tokens
/// from the source code.  This buffer acts as a forward only cursor over the code.  As characters
/// are consumed the location of the cursor in that source is maintained.  Thus allowing the
/// tokenizer to keep track of important points in the source code.
///
/// The buffer owns a copy of the source text.  The interpreter stacks tokenizers over transient
/// strings, for example when `INTERPRET` runs a string popped from the data stack, so the text can
/// not be borrowed from the caller.
pub struct SourceBuffer {
    /// The source code being processed, pre-split into characters for cheap peeking and rewinds.
    chars: Vec<char>,

    /// Index of the next unread character in `chars`.
    position: usize,

    /// The logical location of the cursor in the source code.
    location: SourceLocation,
}

impl SourceBuffer {
    /// Create a new SourceBuffer with the name of, or a meaningful tag for the source code and the
    /// source code itself.
    pub fn new(source_name: &str, source: &str) -> Self {
        SourceBuffer {
            chars: source.chars().collect(),
            position: 0,
            location: SourceLocation::new_from_name(source_name),
        }
    }

    /// Create a new SourceBuffer whose locations are computed relative to a reference location.
    /// Used when tokenizing a fragment nested inside a larger source.
    pub fn new_with_reference(source: &str, reference: SourceLocation) -> Self {
        SourceBuffer {
            chars: source.chars().collect(),
            position: 0,
            location: reference,
        }
    }

    /// Append more text to the end of the buffer.  Used by streaming tokenizers that ran out of
    /// input in the middle of a token.
    pub fn append(&mut self, source: &str) {
        self.chars.extend(source.chars());
    }

    /// The location the cursor is at in the source code being processed.
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Take a peek at the next character in the source code without consuming it.
    pub fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    /// Peek at the character the given distance ahead of the cursor without consuming anything.
    /// A distance of 0 is the same as peek_next.
    pub fn peek_ahead(&self, distance: usize) -> Option<char> {
        self.chars.get(self.position + distance).copied()
    }

    /// Get and consume the next character in the source code.
    pub fn next_char(&mut self) -> Option<char> {
        let next = self.chars.get(self.position).copied();

        if let Some(next_char) = next {
            self.position += 1;
            self.increment_location(next_char);
        }

        next
    }

    /// Capture the cursor state so that the buffer can later be rewound to this exact point.
    pub fn mark(&self) -> (usize, SourceLocation) {
        (self.position, self.location.clone())
    }

    /// Rewind the cursor to a state previously captured with `mark`.  Streaming tokenizers use
    /// this to retry a partial token once more input has arrived.
    pub fn rewind(&mut self, mark: (usize, SourceLocation)) {
        self.position = mark.0;
        self.location = mark.1;
    }

    /// Increment the location based on the next character.  Advance one column for regular
    /// characters.  Reset the column to 1 and increment the line for new line characters.  The
    /// byte offset always advances by the character's UTF-8 width.
    fn increment_location(&mut self, next: char) {
        self.location.offset += next.len_utf8();

        if next == '\n' {
            self.location.line += 1;
            self.location.column = 1;
        } else {
            self.location.column += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_tracking() {
        let mut buffer = SourceBuffer::new("<test>", "ab\ncd");

        assert_eq!(buffer.next_char(), Some('a'));
        assert_eq!(buffer.location().line(), 1);
        assert_eq!(buffer.location().column(), 2);

        assert_eq!(buffer.next_char(), Some('b'));
        assert_eq!(buffer.next_char(), Some('\n'));

        assert_eq!(buffer.location().line(), 2);
        assert_eq!(buffer.location().column(), 1);
        assert_eq!(buffer.location().offset(), 3);
    }

    #[test]
    fn test_rewind_restores_position_and_location() {
        let mut buffer = SourceBuffer::new("<test>", "hello");
        let mark = buffer.mark();

        assert_eq!(buffer.next_char(), Some('h'));
        assert_eq!(buffer.next_char(), Some('e'));

        buffer.rewind(mark);

        assert_eq!(buffer.peek_next(), Some('h'));
        assert_eq!(buffer.location().column(), 1);
        assert_eq!(buffer.location().offset(), 0);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut buffer = SourceBuffer::new("<test>", "xy");

        assert_eq!(buffer.peek_next(), Some('x'));
        assert_eq!(buffer.peek_ahead(1), Some('y'));
        assert_eq!(buffer.peek_ahead(2), None);
        assert_eq!(buffer.next_char(), Some('x'));
    }
}
