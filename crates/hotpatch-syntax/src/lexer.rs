use crate::syntax_kind::SyntaxKind;
use crate::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.start as usize..self.range.end as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub range: TextRange,
}

/// Tokenize `input`. The returned vector always ends with a zero-width [`SyntaxKind::Eof`].
pub fn lex(input: &str) -> Vec<Token> {
    Lexer::new(input).tokenize().0
}

pub fn lex_with_errors(input: &str) -> (Vec<Token>, Vec<LexError>) {
    Lexer::new(input).tokenize()
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// True while only whitespace has been seen since the last newline.
    at_line_start: bool,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            at_line_start: true,
            errors: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        while self.pos < self.input.len() {
            let start = self.pos;
            let kind = self.next_kind();
            debug_assert!(self.pos > start, "lexer must make progress");
            let range = TextRange::new(start, self.pos);
            match kind {
                SyntaxKind::Whitespace => {
                    if self.input[start..self.pos].contains('\n') {
                        self.at_line_start = true;
                    }
                }
                _ => self.at_line_start = false,
            }
            tokens.push(Token { kind, range });
        }
        let end = self.input.len();
        tokens.push(Token {
            kind: SyntaxKind::Eof,
            range: TextRange::new(end, end),
        });
        (tokens, self.errors)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn bump_char(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&mut self, start: usize, message: &str) {
        self.errors.push(LexError {
            message: message.to_string(),
            range: TextRange::new(start, self.pos),
        });
    }

    fn next_kind(&mut self) -> SyntaxKind {
        let start = self.pos;
        let Some(ch) = self.bump_char() else {
            return SyntaxKind::Eof;
        };

        match ch {
            c if c.is_whitespace() => {
                while self.peek().is_some_and(char::is_whitespace) {
                    self.bump_char();
                }
                SyntaxKind::Whitespace
            }
            '/' if self.peek() == Some('/') => {
                let doc = self.peek_nth(1) == Some('/') && self.peek_nth(2) != Some('/');
                self.skip_to_line_end();
                if doc {
                    SyntaxKind::DocComment
                } else {
                    SyntaxKind::LineComment
                }
            }
            '/' if self.peek() == Some('*') => {
                self.bump_char();
                match self.input[self.pos..].find("*/") {
                    Some(rel) => {
                        self.pos += rel + 2;
                        SyntaxKind::BlockComment
                    }
                    None => {
                        self.pos = self.input.len();
                        self.error(start, "unterminated block comment");
                        SyntaxKind::Error
                    }
                }
            }
            '#' if self.at_line_start => {
                self.skip_to_line_end();
                SyntaxKind::PreprocessorDirective
            }
            '"' => self.string_body(start, false),
            '\'' => self.char_literal(start),
            '@' if self.peek() == Some('"') => {
                self.bump_char();
                self.string_body(start, true)
            }
            '@' if self.peek() == Some('$') && self.peek_nth(1) == Some('"') => {
                self.bump_char();
                self.bump_char();
                self.interpolated_body(start, true)
            }
            '$' if self.peek() == Some('"') => {
                self.bump_char();
                self.interpolated_body(start, false)
            }
            '$' if self.peek() == Some('@') && self.peek_nth(1) == Some('"') => {
                self.bump_char();
                self.bump_char();
                self.interpolated_body(start, true)
            }
            '@' if self.peek().is_some_and(is_ident_start) => {
                // Verbatim identifier: `@class` is an identifier, never a keyword.
                self.eat_ident_rest();
                SyntaxKind::Identifier
            }
            c if is_ident_start(c) => {
                self.eat_ident_rest();
                SyntaxKind::from_keyword(&self.input[start..self.pos])
                    .unwrap_or(SyntaxKind::Identifier)
            }
            c if c.is_ascii_digit() => self.number(c),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.number('.'),
            _ => self.punctuation(start, ch),
        }
    }

    fn skip_to_line_end(&mut self) {
        match self.input[self.pos..].find(['\n', '\r']) {
            Some(rel) => self.pos += rel,
            None => self.pos = self.input.len(),
        }
    }

    fn eat_ident_rest(&mut self) {
        while self.peek().is_some_and(is_ident_continue) {
            self.bump_char();
        }
    }

    fn string_body(&mut self, start: usize, verbatim: bool) -> SyntaxKind {
        if self.scan_string(verbatim) {
            SyntaxKind::StringLiteral
        } else {
            self.error(start, "unterminated string literal");
            SyntaxKind::Error
        }
    }

    /// Scans the rest of a string literal whose opening quote was consumed.
    fn scan_string(&mut self, verbatim: bool) -> bool {
        while let Some(ch) = self.bump_char() {
            match ch {
                '"' if verbatim && self.peek() == Some('"') => {
                    self.bump_char();
                }
                '"' => return true,
                '\\' if !verbatim => {
                    self.bump_char();
                }
                '\n' if !verbatim => return false,
                _ => {}
            }
        }
        false
    }

    fn interpolated_body(&mut self, start: usize, verbatim: bool) -> SyntaxKind {
        let mut depth = 0usize;
        while let Some(ch) = self.bump_char() {
            match ch {
                '{' if depth == 0 && self.peek() == Some('{') => {
                    self.bump_char();
                }
                '}' if depth == 0 && self.peek() == Some('}') => {
                    self.bump_char();
                }
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                '"' if depth > 0 => {
                    // Nested (non-verbatim) string inside an interpolation hole.
                    if !self.scan_string(false) {
                        break;
                    }
                }
                '"' if verbatim && self.peek() == Some('"') => {
                    self.bump_char();
                }
                '"' => return SyntaxKind::InterpolatedStringLiteral,
                '\\' if !verbatim => {
                    self.bump_char();
                }
                '\n' if !verbatim && depth == 0 => break,
                _ => {}
            }
        }
        self.error(start, "unterminated interpolated string");
        SyntaxKind::Error
    }

    fn char_literal(&mut self, start: usize) -> SyntaxKind {
        while let Some(ch) = self.bump_char() {
            match ch {
                '\'' => return SyntaxKind::CharLiteral,
                '\\' => {
                    self.bump_char();
                }
                '\n' => break,
                _ => {}
            }
        }
        self.error(start, "unterminated character literal");
        SyntaxKind::Error
    }

    fn number(&mut self, first: char) -> SyntaxKind {
        let mut real = first == '.';
        if first == '0' && matches!(self.peek(), Some('x' | 'X' | 'b' | 'B')) {
            self.bump_char();
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.bump_char();
            }
            self.eat_integer_suffix();
            return SyntaxKind::IntLiteral;
        }

        self.eat_digits();
        if !real
            && self.peek() == Some('.')
            && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.bump_char();
            real = true;
            self.eat_digits();
        } else if real {
            self.eat_digits();
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_nth(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                real = true;
                self.bump_char();
                if sign {
                    self.bump_char();
                }
                self.eat_digits();
            }
        }

        match self.peek() {
            Some('f' | 'F' | 'd' | 'D' | 'm' | 'M') => {
                self.bump_char();
                SyntaxKind::RealLiteral
            }
            _ if real => SyntaxKind::RealLiteral,
            _ => {
                self.eat_integer_suffix();
                SyntaxKind::IntLiteral
            }
        }
    }

    fn eat_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.bump_char();
        }
    }

    fn eat_integer_suffix(&mut self) {
        for _ in 0..2 {
            if matches!(self.peek(), Some('u' | 'U' | 'l' | 'L')) {
                self.bump_char();
            }
        }
    }

    fn punctuation(&mut self, start: usize, ch: char) -> SyntaxKind {
        match ch {
            '(' => SyntaxKind::LParen,
            ')' => SyntaxKind::RParen,
            '{' => SyntaxKind::LBrace,
            '}' => SyntaxKind::RBrace,
            '[' => SyntaxKind::LBracket,
            ']' => SyntaxKind::RBracket,
            ';' => SyntaxKind::Semicolon,
            ',' => SyntaxKind::Comma,
            '.' => SyntaxKind::Dot,
            '~' => SyntaxKind::Tilde,
            ':' => {
                if self.eat(':') {
                    SyntaxKind::DoubleColon
                } else {
                    SyntaxKind::Colon
                }
            }
            '?' => {
                if self.peek() == Some('?') {
                    self.bump_char();
                    if self.eat('=') {
                        SyntaxKind::QuestionQuestionEq
                    } else {
                        SyntaxKind::QuestionQuestion
                    }
                } else if self.peek() == Some('.')
                    && !self.peek_nth(1).is_some_and(|c| c.is_ascii_digit())
                {
                    self.bump_char();
                    SyntaxKind::QuestionDot
                } else {
                    SyntaxKind::Question
                }
            }
            '=' => {
                if self.eat('=') {
                    SyntaxKind::EqEq
                } else if self.eat('>') {
                    SyntaxKind::FatArrow
                } else {
                    SyntaxKind::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    SyntaxKind::BangEq
                } else {
                    SyntaxKind::Bang
                }
            }
            '+' => {
                if self.eat('+') {
                    SyntaxKind::PlusPlus
                } else if self.eat('=') {
                    SyntaxKind::PlusEq
                } else {
                    SyntaxKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    SyntaxKind::MinusMinus
                } else if self.eat('=') {
                    SyntaxKind::MinusEq
                } else {
                    SyntaxKind::Minus
                }
            }
            '*' => {
                if self.eat('=') {
                    SyntaxKind::StarEq
                } else {
                    SyntaxKind::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    SyntaxKind::SlashEq
                } else {
                    SyntaxKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    SyntaxKind::PercentEq
                } else {
                    SyntaxKind::Percent
                }
            }
            '^' => {
                if self.eat('=') {
                    SyntaxKind::CaretEq
                } else {
                    SyntaxKind::Caret
                }
            }
            '&' => {
                if self.eat('&') {
                    SyntaxKind::AmpAmp
                } else if self.eat('=') {
                    SyntaxKind::AmpEq
                } else {
                    SyntaxKind::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    SyntaxKind::PipePipe
                } else if self.eat('=') {
                    SyntaxKind::PipeEq
                } else {
                    SyntaxKind::Pipe
                }
            }
            '<' => {
                if self.eat('<') {
                    if self.eat('=') {
                        SyntaxKind::LeftShiftEq
                    } else {
                        SyntaxKind::LeftShift
                    }
                } else if self.eat('=') {
                    SyntaxKind::LessEq
                } else {
                    SyntaxKind::Less
                }
            }
            '>' => {
                // `>>` is split back into two `>` by the parser when closing type arguments.
                if self.peek() == Some('>') {
                    self.bump_char();
                    if self.eat('=') {
                        SyntaxKind::RightShiftEq
                    } else {
                        SyntaxKind::RightShift
                    }
                } else if self.eat('=') {
                    SyntaxKind::GreaterEq
                } else {
                    SyntaxKind::Greater
                }
            }
            _ => {
                self.error(start, "unexpected character");
                SyntaxKind::Error
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

fn is_ident_continue(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}
