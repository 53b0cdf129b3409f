//! Lossless C# syntax trees for the hotpatch rewriter.
//!
//! Entry points:
//! - [`parse_csharp`]: parses a full compilation unit into a rowan tree. The tree keeps every
//!   byte of the input (whitespace, comments and preprocessor lines are trivia tokens), so
//!   printing the root reproduces the source exactly.
//! - [`parse_csharp_expression`]: parses a single expression snippet. Rewrite passes use it to
//!   synthesise replacement nodes from text templates.
//!
//! The grammar is the subset of C# that Unity gameplay scripts use. The parser always produces a
//! tree; malformed input yields `Error` nodes plus [`ParseError`]s.

pub mod ast;
mod lexer;
mod parser;
mod syntax_kind;

pub use ast::*;
pub use lexer::{lex, lex_with_errors, LexError, Lexer, Token};
pub use parser::{
    debug_dump, parse_csharp, parse_csharp_expression, CSharpParseResult, SyntaxElement,
    SyntaxNode, SyntaxToken,
};
pub use syntax_kind::{CSharpLanguage, SyntaxKind};

use serde::{Deserialize, Serialize};

/// A half-open byte range within a source file (`start..end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

impl From<text_size::TextRange> for TextRange {
    fn from(range: text_size::TextRange) -> Self {
        Self {
            start: u32::from(range.start()),
            end: u32::from(range.end()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} at {}..{}", range.start, range.end)]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

#[cfg(test)]
mod tests;
