use crate::{
    lang::source_buffer::{SourceBuffer, SourceLocation},
    runtime::error::{self, ErrorKind, ScriptError},
};
use std::fmt::{self, Debug, Display, Formatter};

/// The kinds of token that can appear in a Forthic source text.  The language is small enough that
/// the full alphabet fits in one flat enumeration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// A word to be looked up and executed, or recognized as a literal.
    Word,

    /// A string literal, single or triple delimited.
    String,

    /// A comment running from `#` to the end of the line.
    Comment,

    /// The `[` array open delimiter.
    StartArray,

    /// The `]` array close delimiter.
    EndArray,

    /// A `{name` module open.  The text carries the module name, which may be empty.
    StartModule,

    /// The `}` module close.
    EndModule,

    /// A `:` definition open.  The text carries the new word's name.
    StartDef,

    /// A `@:` memoized definition open.  The text carries the new word's name.
    StartMemo,

    /// The `;` definition terminator.
    EndDef,

    /// A `.name` token.  The text carries the name without the leading dot.
    DotSymbol,

    /// The end of the source text.  Produced exactly once per input.
    Eos,
}

/// A token is a simple unit of the language.  The token holds its kind, its literal text, and the
/// location in the original source code where it was found.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: String,
    location: SourceLocation,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, text: String, location: SourceLocation) -> Token {
        Token {
            kind,
            text,
            location,
        }
    }

    /// What kind of token is this?
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The token's literal text.  For delimiter tokens like `[` this is the delimiter itself, for
    /// strings it is the content without the quotes, for definitions it is the new word's name.
    pub fn text(&self) -> &String {
        &self.text
    }

    /// Get the token's location in the original source text.
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}

/// Make sure that the tokens are nicely printable for debugging purposes.
impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Include the kind and the original location for debugging purposes.
impl Debug for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {:?} {:?}", self.location, self.kind, self.text)
    }
}

/// Check if the given character is considered whitespace.  Parentheses and commas are benign
/// separators in Forthic and carry no syntactic role.
fn is_whitespace(next: char) -> bool {
    matches!(next, ' ' | '\t' | '\r' | '\n' | '(' | ')' | ',')
}

/// Check if the given character ends the accumulation of a word token.
fn ends_word(next: char) -> bool {
    is_whitespace(next) || matches!(next, ';' | '{' | '}' | '#' | ']')
}

/// Check if the given character is one of the three string delimiters.
fn is_string_delimiter(next: char) -> bool {
    matches!(next, '"' | '\'' | '^')
}

/// The Forthic tokenizer.  A character driven state machine that produces a lazy sequence of
/// tokens from a source string.  Each call to `next_token` pulls the next token out of the buffer.
///
/// The tokenizer is restartable per fresh input.  Infinite streams are not supported, but the
/// `streaming` flag permits returning the "no token yet" sentinel on an unclosed string, at which
/// point the caller can `feed` more text and retry.
pub struct Tokenizer {
    /// Cursor over the source text.
    buffer: SourceBuffer,

    /// When set, an unclosed string yields `Ok(None)` instead of an error.
    streaming: bool,

    /// The end of source token is produced exactly once.
    eos_emitted: bool,
}

impl Tokenizer {
    /// Create a tokenizer over a complete source string.
    pub fn new(source_name: &str, source: &str) -> Tokenizer {
        Tokenizer {
            buffer: SourceBuffer::new(source_name, source),
            streaming: false,
            eos_emitted: false,
        }
    }

    /// Create a tokenizer whose token locations are offset by a reference location.  Used to
    /// tokenize a fragment nested inside a larger source.
    pub fn new_with_reference(source: &str, reference: SourceLocation) -> Tokenizer {
        Tokenizer {
            buffer: SourceBuffer::new_with_reference(source, reference),
            streaming: false,
            eos_emitted: false,
        }
    }

    /// Create a streaming tokenizer.  When the input ends in the middle of a string literal the
    /// tokenizer reports "no token yet" rather than failing, and the partial token is retried
    /// after the next `feed`.
    pub fn new_streaming(source_name: &str, source: &str) -> Tokenizer {
        Tokenizer {
            buffer: SourceBuffer::new(source_name, source),
            streaming: true,
            eos_emitted: false,
        }
    }

    /// Append more source text.  Only meaningful for streaming tokenizers.
    pub fn feed(&mut self, source: &str) {
        self.buffer.append(source);

        // More text means the end of the stream has moved.
        self.eos_emitted = false;
    }

    /// Pull the next token from the source text.
    ///
    /// Returns `Ok(Some(token))` for each token, ending with a single `Eos` token.  After the
    /// `Eos` has been produced, or when a streaming tokenizer is waiting for more input, `Ok(None)`
    /// is returned.
    pub fn next_token(&mut self) -> error::Result<Option<Token>> {
        loop {
            let next = match self.buffer.peek_next() {
                Some(next) => next,
                None => {
                    if self.eos_emitted {
                        return Ok(None);
                    }

                    self.eos_emitted = true;

                    return Ok(Some(Token::new(
                        TokenKind::Eos,
                        String::new(),
                        self.buffer.location().clone(),
                    )));
                }
            };

            if is_whitespace(next) {
                let _ = self.buffer.next_char();
                continue;
            }

            return match next {
                '#' => self.process_comment().map(Some),
                '[' => Ok(Some(self.single_char_token(TokenKind::StartArray))),
                ']' => Ok(Some(self.single_char_token(TokenKind::EndArray))),
                '}' => Ok(Some(self.single_char_token(TokenKind::EndModule))),
                ';' => Ok(Some(self.single_char_token(TokenKind::EndDef))),
                '{' => self.process_start_module().map(Some),
                ':' => self.process_definition(TokenKind::StartDef).map(Some),

                '@' if self.buffer.peek_ahead(1) == Some(':') => {
                    self.process_definition(TokenKind::StartMemo).map(Some)
                }

                _ if is_string_delimiter(next) => self.process_string(),

                _ => self.process_word().map(Some),
            };
        }
    }

    /// Consume a single delimiter character and wrap it in a token of the given kind.
    fn single_char_token(&mut self, kind: TokenKind) -> Token {
        let location = self.buffer.location().clone();
        let text = self.buffer.next_char().unwrap().to_string();

        Token::new(kind, text, location)
    }

    /// Consume a comment.  Comments run from `#` to the end of the line, exclusive of the newline
    /// itself.  The token text carries everything after the `#`.
    fn process_comment(&mut self) -> error::Result<Token> {
        let location = self.buffer.location().clone();
        let mut text = String::new();

        // Consume the #.
        let _ = self.buffer.next_char();

        while let Some(next) = self.buffer.peek_next() {
            if next == '\n' {
                break;
            }

            text.push(self.buffer.next_char().unwrap());
        }

        Ok(Token::new(TokenKind::Comment, text, location))
    }

    /// Consume a `{name` module open.  A bare `{` produces a start-module token with an empty
    /// name.
    fn process_start_module(&mut self) -> error::Result<Token> {
        let location = self.buffer.location().clone();

        // Consume the {.
        let _ = self.buffer.next_char();

        let mut name = String::new();

        while let Some(next) = self.buffer.peek_next() {
            if ends_word(next) || next == '[' {
                break;
            }

            name.push(self.buffer.next_char().unwrap());
        }

        Ok(Token::new(TokenKind::StartModule, name, location))
    }

    /// Consume a `:` or `@:` definition open and the name that follows it.  The name may be
    /// separated from the punctuation by whitespace.  A quote, bracket, or brace where the name is
    /// expected is a lex error, as is running out of input.
    fn process_definition(&mut self, kind: TokenKind) -> error::Result<Token> {
        let location = self.buffer.location().clone();

        // Consume the : or the @:.
        let _ = self.buffer.next_char();

        if kind == TokenKind::StartMemo {
            let _ = self.buffer.next_char();
        }

        while let Some(next) = self.buffer.peek_next() {
            if !is_whitespace(next) {
                break;
            }

            let _ = self.buffer.next_char();
        }

        match self.buffer.peek_next() {
            None => ScriptError::new_as_result(
                Some(location),
                ErrorKind::InvalidWordName("<end of input>".to_string()),
            ),

            Some(next) if is_string_delimiter(next) || matches!(next, '[' | ']' | '{' | '}') => {
                ScriptError::new_as_result(
                    Some(location),
                    ErrorKind::InvalidWordName(next.to_string()),
                )
            }

            Some(_) => {
                let mut name = String::new();

                while let Some(next) = self.buffer.peek_next() {
                    if ends_word(next) || next == '[' {
                        break;
                    }

                    name.push(self.buffer.next_char().unwrap());
                }

                Ok(Token::new(kind, name, location))
            }
        }
    }

    /// Consume a string literal.  The delimiter can be any of `"`, `'`, or `^`.  A triple
    /// occurrence of the delimiter starts a heredoc style string that ends at the next triple,
    /// with a greedy deferred close when extra delimiter characters follow it.
    ///
    /// Returns `Ok(None)` when a streaming tokenizer runs out of input mid-string.
    fn process_string(&mut self) -> error::Result<Option<Token>> {
        let mark = self.buffer.mark();
        let location = self.buffer.location().clone();
        let delimiter = self.buffer.next_char().unwrap();

        let triple = self.buffer.peek_next() == Some(delimiter)
            && self.buffer.peek_ahead(1) == Some(delimiter);

        if triple {
            // Consume the rest of the opening triple.
            let _ = self.buffer.next_char();
            let _ = self.buffer.next_char();

            self.process_triple_string(mark, location, delimiter)
        } else {
            self.process_single_string(mark, location, delimiter)
        }
    }

    /// Body of a single delimited string, everything up to the next occurrence of the delimiter.
    fn process_single_string(
        &mut self,
        mark: (usize, SourceLocation),
        location: SourceLocation,
        delimiter: char,
    ) -> error::Result<Option<Token>> {
        let mut text = String::new();

        loop {
            match self.buffer.next_char() {
                Some(next) if next == delimiter => {
                    return Ok(Some(Token::new(TokenKind::String, text, location)));
                }

                Some(next) => text.push(next),

                None => return self.unterminated_string(mark, location),
            }
        }
    }

    /// Body of a triple delimited string.  The close is the next triple occurrence of the
    /// delimiter; when the character immediately after a candidate close is the same delimiter
    /// the close is deferred greedily, which permits embedding the triple itself.
    fn process_triple_string(
        &mut self,
        mark: (usize, SourceLocation),
        location: SourceLocation,
        delimiter: char,
    ) -> error::Result<Option<Token>> {
        let mut text = String::new();

        loop {
            match self.buffer.peek_next() {
                None => return self.unterminated_string(mark, location),

                Some(next) if next == delimiter => {
                    let candidate = self.buffer.peek_ahead(1) == Some(delimiter)
                        && self.buffer.peek_ahead(2) == Some(delimiter);

                    if candidate && self.buffer.peek_ahead(3) != Some(delimiter) {
                        // A clean triple with no extra delimiter after it closes the string.
                        let _ = self.buffer.next_char();
                        let _ = self.buffer.next_char();
                        let _ = self.buffer.next_char();

                        return Ok(Some(Token::new(TokenKind::String, text, location)));
                    }

                    // Either a lone delimiter or a deferred close.  Take one character and keep
                    // scanning.
                    text.push(self.buffer.next_char().unwrap());
                }

                Some(_) => text.push(self.buffer.next_char().unwrap()),
            }
        }
    }

    /// Report, or in streaming mode defer, an unterminated string literal.
    fn unterminated_string(
        &mut self,
        mark: (usize, SourceLocation),
        location: SourceLocation,
    ) -> error::Result<Option<Token>> {
        if self.streaming {
            self.buffer.rewind(mark);
            return Ok(None);
        }

        ScriptError::new_as_result(Some(location), ErrorKind::UnterminatedString)
    }

    /// Accumulate a word token.  Words are terminated by whitespace or one of `;`, `{`, `}`, `#`,
    /// `]`.  A `[` also terminates a word, except when the word already contains a `T`, in which
    /// case characters up to and including the matching `]` are absorbed.  This captures RFC 9557
    /// datetime lexemes like `2025-05-24T10:15:00[America/Los_Angeles]`.
    ///
    /// A word whose first character is `.` and whose length exceeds one is a dot symbol.
    fn process_word(&mut self) -> error::Result<Token> {
        let location = self.buffer.location().clone();
        let mut text = String::new();

        while let Some(next) = self.buffer.peek_next() {
            if next == '[' {
                if !text.contains('T') {
                    break;
                }

                // Absorb the bracketed annotation, close bracket included.
                while let Some(absorbed) = self.buffer.next_char() {
                    text.push(absorbed);

                    if absorbed == ']' {
                        break;
                    }
                }

                continue;
            }

            if ends_word(next) {
                break;
            }

            text.push(self.buffer.next_char().unwrap());
        }

        if text.starts_with('.') && text.len() > 1 {
            return Ok(Token::new(
                TokenKind::DotSymbol,
                text[1..].to_string(),
                location,
            ));
        }

        Ok(Token::new(TokenKind::Word, text, location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(source: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new("<test>", source);
        let mut tokens = Vec::new();

        while let Some(token) = tokenizer.next_token().unwrap() {
            tokens.push(token);
        }

        tokens
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        all_tokens(source).iter().map(|token| token.kind()).collect()
    }

    #[test]
    fn test_simple_words() {
        let tokens = all_tokens("1 2 +");

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].text(), "1");
        assert_eq!(tokens[1].text(), "2");
        assert_eq!(tokens[2].text(), "+");
        assert_eq!(tokens[3].kind(), TokenKind::Eos);
    }

    #[test]
    fn test_parens_and_commas_are_whitespace() {
        let tokens = all_tokens("( a , b )");

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text(), "a");
        assert_eq!(tokens[1].text(), "b");
    }

    #[test]
    fn test_comment_runs_to_end_of_line() {
        let tokens = all_tokens("1 # a comment ; ] }\n2");

        assert_eq!(tokens[0].text(), "1");
        assert_eq!(tokens[1].kind(), TokenKind::Comment);
        assert_eq!(tokens[1].text(), " a comment ; ] }");
        assert_eq!(tokens[2].text(), "2");
    }

    #[test]
    fn test_string_delimiters() {
        for source in ["\"howdy\"", "'howdy'", "^howdy^"] {
            let tokens = all_tokens(source);

            assert_eq!(tokens[0].kind(), TokenKind::String);
            assert_eq!(tokens[0].text(), "howdy");
        }
    }

    #[test]
    fn test_triple_quoted_string() {
        let tokens = all_tokens("\"\"\"a \"quoted\" thing\"\"\"");

        assert_eq!(tokens[0].kind(), TokenKind::String);
        assert_eq!(tokens[0].text(), "a \"quoted\" thing");
    }

    #[test]
    fn test_triple_quote_deferred_close() {
        // The extra delimiter after the candidate close belongs to the content.
        let tokens = all_tokens("\"\"\"a\"\"\"\"");

        assert_eq!(tokens[0].kind(), TokenKind::String);
        assert_eq!(tokens[0].text(), "a\"");
    }

    #[test]
    fn test_string_can_span_lines() {
        let tokens = all_tokens("'line one\nline two'");

        assert_eq!(tokens[0].text(), "line one\nline two");
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let mut tokenizer = Tokenizer::new("<test>", "\"oops");
        let result = tokenizer.next_token();

        assert!(result.is_err());
        assert_eq!(*result.unwrap_err().kind(), ErrorKind::UnterminatedString);
    }

    #[test]
    fn test_streaming_unterminated_string_is_pending() {
        let mut tokenizer = Tokenizer::new_streaming("<test>", "\"partial");

        assert!(tokenizer.next_token().unwrap().is_none());

        tokenizer.feed(" string\"");

        let token = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(token.kind(), TokenKind::String);
        assert_eq!(token.text(), "partial string");
    }

    #[test]
    fn test_array_tokens() {
        assert_eq!(
            kinds("[ 1 2 ]"),
            vec![
                TokenKind::StartArray,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::EndArray,
                TokenKind::Eos
            ]
        );
    }

    #[test]
    fn test_bracket_ends_a_word() {
        let tokens = all_tokens("DUP[");

        assert_eq!(tokens[0].kind(), TokenKind::Word);
        assert_eq!(tokens[0].text(), "DUP");
        assert_eq!(tokens[1].kind(), TokenKind::StartArray);
    }

    #[test]
    fn test_module_tokens() {
        let tokens = all_tokens("{geo lat }");

        assert_eq!(tokens[0].kind(), TokenKind::StartModule);
        assert_eq!(tokens[0].text(), "geo");
        assert_eq!(tokens[1].kind(), TokenKind::Word);
        assert_eq!(tokens[2].kind(), TokenKind::EndModule);
    }

    #[test]
    fn test_bare_brace_is_anonymous_module() {
        let tokens = all_tokens("{ }");

        assert_eq!(tokens[0].kind(), TokenKind::StartModule);
        assert_eq!(tokens[0].text(), "");
        assert_eq!(tokens[1].kind(), TokenKind::EndModule);
    }

    #[test]
    fn test_definition_tokens() {
        let tokens = all_tokens(": DOUBLE 2 * ;");

        assert_eq!(tokens[0].kind(), TokenKind::StartDef);
        assert_eq!(tokens[0].text(), "DOUBLE");
        assert_eq!(tokens[3].kind(), TokenKind::EndDef);
    }

    #[test]
    fn test_memo_definition_tokens() {
        let tokens = all_tokens("@: CACHED 42 ;");

        assert_eq!(tokens[0].kind(), TokenKind::StartMemo);
        assert_eq!(tokens[0].text(), "CACHED");
    }

    #[test]
    fn test_invalid_definition_name() {
        let mut tokenizer = Tokenizer::new("<test>", ": \"NAME\" ;");
        let result = tokenizer.next_token();

        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err().kind(),
            ErrorKind::InvalidWordName(_)
        ));
    }

    #[test]
    fn test_dot_symbol() {
        let tokens = all_tokens(".field");

        assert_eq!(tokens[0].kind(), TokenKind::DotSymbol);
        assert_eq!(tokens[0].text(), "field");
    }

    #[test]
    fn test_bare_dot_is_a_word() {
        let tokens = all_tokens(".");

        assert_eq!(tokens[0].kind(), TokenKind::Word);
        assert_eq!(tokens[0].text(), ".");
    }

    #[test]
    fn test_datetime_lexeme_absorbs_bracket() {
        let tokens = all_tokens("2025-05-24T10:15:00[America/Los_Angeles] NEXT");

        assert_eq!(tokens[0].kind(), TokenKind::Word);
        assert_eq!(tokens[0].text(), "2025-05-24T10:15:00[America/Los_Angeles]");
        assert_eq!(tokens[1].text(), "NEXT");
    }

    #[test]
    fn test_eos_exactly_once() {
        let mut tokenizer = Tokenizer::new("<test>", "1");

        assert_eq!(tokenizer.next_token().unwrap().unwrap().kind(), TokenKind::Word);
        assert_eq!(tokenizer.next_token().unwrap().unwrap().kind(), TokenKind::Eos);
        assert!(tokenizer.next_token().unwrap().is_none());
    }

    #[test]
    fn test_token_locations() {
        let tokens = all_tokens("a\n  b");

        assert_eq!(tokens[0].location().line(), 1);
        assert_eq!(tokens[0].location().column(), 1);
        assert_eq!(tokens[1].location().line(), 2);
        assert_eq!(tokens[1].location().column(), 3);
        assert_eq!(tokens[1].location().offset(), 4);
    }
}
