/// Module for managing the original source code.
pub mod source_buffer;

/// Module for managing the turning of the source code into a lazy stream of tokens for the
/// interpreter to consume.
pub mod tokenizing;
