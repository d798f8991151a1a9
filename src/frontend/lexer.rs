//! Lexer for the harambe language
//!
//! Converts source code into a stream of tokens. Every token carries the
//! 1-based line and column of its first character; positions flow through
//! the AST into name-analysis diagnostics.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::Pos;

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    /// Current line (1-based)
    line: u32,
    /// Current column (1-based)
    col: u32,
    /// Position of the current token's first character
    token_pos: Pos,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: 1,
            col: 1,
            token_pos: Pos::new(1, 1),
        }
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the next character without advancing
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        c
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Create a token positioned at the start of the current lexeme
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.token_pos)
    }

    /// The text of the current lexeme
    fn lexeme(&self) -> String {
        self.source[self.start..self.pos].iter().collect()
    }

    /// Skip whitespace and comments
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                // Line comment
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                // Block comment
                '/' if self.peek_next() == Some('*') => {
                    self.advance(); // skip /
                    self.advance(); // skip *
                    let mut depth = 1;
                    while depth > 0 && !self.is_at_end() {
                        match (self.peek(), self.peek_next()) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                depth -= 1;
                            }
                            (Some('/'), Some('*')) => {
                                self.advance();
                                self.advance();
                                depth += 1;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text = self.lexeme();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));
        self.make_token(kind)
    }

    /// Read an integer literal
    fn read_number(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // Oversized literals clamp to the largest representable value
        let value = self.lexeme().parse().unwrap_or(i32::MAX);
        self.make_token(TokenKind::IntLit(value))
    }

    /// Read a string literal, keeping the raw lexeme (quotes and escapes
    /// included) so the unparser can reproduce it verbatim
    fn read_string(&mut self) -> Token {
        self.advance(); // consume opening quote

        while let Some(c) = self.peek() {
            if c == '"' {
                self.advance(); // consume closing quote
                break;
            } else if c == '\\' {
                self.advance();
                self.advance();
            } else if c == '\n' {
                // Unterminated string
                break;
            } else {
                self.advance();
            }
        }

        let text = self.lexeme();
        self.make_token(TokenKind::StrLit(text))
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.pos;
        self.token_pos = Pos::new(self.line, self.col);

        if self.is_at_end() {
            return Token::eof(self.token_pos);
        }

        let c = self.peek().unwrap();

        // Identifiers and keywords
        if c.is_alphabetic() || c == '_' {
            return self.read_identifier();
        }

        // Numbers
        if c.is_ascii_digit() {
            return self.read_number();
        }

        // String literals
        if c == '"' {
            return self.read_string();
        }

        self.advance();

        // Operators and punctuation
        let kind = match c {
            '+' => {
                if self.peek() == Some('+') {
                    self.advance();
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.peek() == Some('-') {
                    self.advance();
                    TokenKind::MinusMinus
                } else {
                    TokenKind::Minus
                }
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    TokenKind::Not
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Le
                } else if self.peek() == Some('<') {
                    self.advance();
                    TokenKind::Write
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Ge
                } else if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::Read
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    TokenKind::AndAnd
                } else {
                    TokenKind::Unknown('&')
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    TokenKind::OrOr
                } else {
                    TokenKind::Unknown('|')
                }
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,
            _ => TokenKind::Unknown(c),
        };

        self.make_token(kind)
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new("int main() { }");
        let tokens = lexer.tokenize();

        assert!(matches!(tokens[0].kind, TokenKind::Int));
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "main"));
        assert!(matches!(tokens[2].kind, TokenKind::LParen));
        assert!(matches!(tokens[3].kind, TokenKind::RParen));
        assert!(matches!(tokens[4].kind, TokenKind::LBrace));
        assert!(matches!(tokens[5].kind, TokenKind::RBrace));
        assert!(matches!(tokens[6].kind, TokenKind::Eof));
    }

    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new("int x;\n  x = 3;");
        let tokens = lexer.tokenize();

        assert_eq!(tokens[0].pos, Pos::new(1, 1)); // int
        assert_eq!(tokens[1].pos, Pos::new(1, 5)); // x
        assert_eq!(tokens[2].pos, Pos::new(1, 6)); // ;
        assert_eq!(tokens[3].pos, Pos::new(2, 3)); // x
        assert_eq!(tokens[4].pos, Pos::new(2, 5)); // =
    }

    #[test]
    fn test_two_char_operators() {
        let mut lexer = Lexer::new("<< >> ++ -- == != <= >= && ||");
        let kinds: Vec<_> = lexer.tokenize().into_iter().map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Write,
                TokenKind::Read,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_keeps_raw_lexeme() {
        let mut lexer = Lexer::new(r#"cout << "hi\n";"#);
        let tokens = lexer.tokenize();

        assert!(matches!(tokens[2].kind, TokenKind::StrLit(ref s) if s == r#""hi\n""#));
    }

    #[test]
    fn test_comments_skipped() {
        let mut lexer = Lexer::new("int /* a /* nested */ b */ x; // tail\nbool y;");
        let kinds: Vec<_> = lexer.tokenize().into_iter().map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Int,
                TokenKind::Ident("x".into()),
                TokenKind::Semicolon,
                TokenKind::Bool,
                TokenKind::Ident("y".into()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_oversized_int_clamps() {
        let mut lexer = Lexer::new("99999999999");
        let tokens = lexer.tokenize();

        assert!(matches!(tokens[0].kind, TokenKind::IntLit(v) if v == i32::MAX));
    }
}
