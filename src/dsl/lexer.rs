//! Lexer (tokenizer) for the netlist language.

use crate::error::{NetlistError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in the netlist language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A class, device, pin or model name (`TTL_7400_NAND`, `U1.Q`)
    Identifier,
    /// A number, possibly with an SI suffix (`10k`, `-1.5e-3`)
    Number,
    /// A directive (starts with '.')
    Directive,
    /// Open parenthesis '('
    OpenParen,
    /// Close parenthesis ')'
    CloseParen,
    /// Equals sign '='
    Equals,
    /// Newline
    Newline,
    /// End of file
    Eof,
}

/// Characters that end a word.
fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | '=' | '#' | ';')
}

/// Lexer for tokenizing netlist input.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;
        let token = |kind, text: &str| Token {
            kind,
            text: text.to_string(),
            line,
            column,
        };

        let Some(&ch) = self.chars.peek() else {
            return Ok(token(TokenKind::Eof, ""));
        };

        let single = match ch {
            '\n' => Some(TokenKind::Newline),
            '(' => Some(TokenKind::OpenParen),
            ')' => Some(TokenKind::CloseParen),
            '=' => Some(TokenKind::Equals),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(token(kind, &ch.to_string()));
        }

        let word = self.read_word();
        if word.is_empty() {
            return Err(NetlistError::lexer(
                line,
                column,
                format!("unexpected character '{}'", ch),
            ));
        }

        let kind = if word.starts_with('.') && word[1..].starts_with(|c: char| c.is_alphabetic()) {
            TokenKind::Directive
        } else if parse_value(&word).is_some() {
            TokenKind::Number
        } else if word
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '+'))
        {
            TokenKind::Identifier
        } else {
            return Err(NetlistError::lexer(
                line,
                column,
                format!("invalid word '{}'", word),
            ));
        };
        Ok(token(kind, &word))
    }

    /// Collect every token up to and including end of input.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if eof {
                return Ok(tokens);
            }
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '#' || ch == ';' {
                // Comment runs to end of line
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if is_delimiter(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }
}

fn si_multiplier(suffix: char) -> Option<f64> {
    match suffix {
        'p' => Some(1e-12),
        'n' => Some(1e-9),
        'u' | 'µ' => Some(1e-6),
        'm' => Some(1e-3),
        'k' | 'K' => Some(1e3),
        'M' => Some(1e6),
        'G' => Some(1e9),
        _ => None,
    }
}

/// Parse a number with an optional SI suffix (`p n u m k M G`).
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '-' | '+' | '.')) {
        return None;
    }

    let (num_str, multiplier) = match text.chars().last().and_then(|c| si_multiplier(c).map(|m| (c, m))) {
        Some((last, mult)) => (&text[..text.len() - last.len_utf8()], mult),
        None => (text, 1.0),
    };

    num_str
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v * multiplier)
}

/// Parse a time in seconds: a number with an optional SI suffix and an
/// optional trailing `s` (`10ms`, `2.5us`, `1s`, `3e-6`).
pub fn parse_time_value(text: &str) -> Option<f64> {
    parse_value(text).or_else(|| text.strip_suffix('s').and_then(parse_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_value() {
        assert_relative_eq!(parse_value("10k").unwrap(), 10_000.0);
        assert_relative_eq!(parse_value("100n").unwrap(), 100e-9);
        assert_relative_eq!(parse_value("4.7u").unwrap(), 4.7e-6);
        assert_relative_eq!(parse_value("1M").unwrap(), 1_000_000.0);
        assert_relative_eq!(parse_value("-2.2").unwrap(), -2.2);
        assert_relative_eq!(parse_value("1e-9").unwrap(), 1e-9);
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value("U1.Q"), None);
        assert_eq!(parse_value("1N914"), None);
    }

    #[test]
    fn test_parse_time_value() {
        assert_relative_eq!(parse_time_value("10ms").unwrap(), 10e-3);
        assert_relative_eq!(parse_time_value("2.5us").unwrap(), 2.5e-6);
        assert_relative_eq!(parse_time_value("1s").unwrap(), 1.0);
        assert_relative_eq!(parse_time_value("5m").unwrap(), 5e-3);
        assert_eq!(parse_time_value("s"), None);
    }

    #[test]
    fn test_lexer_words() {
        let tokens = Lexer::new("TTL_7400_NAND U1 A.Q 10k R=1k").tokenize().unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Number,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[2].text, "A.Q");
        assert_eq!(tokens[3].column, 22);
    }

    #[test]
    fn test_lexer_directive_and_comments() {
        let tokens = Lexer::new("# header\n.model D1 D (is=1e-14) ; trailing\n")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Newline);
        assert_eq!(tokens[1].kind, TokenKind::Directive);
        assert_eq!(tokens[1].text, ".model");
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[4].kind, TokenKind::OpenParen);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_lexer_rejects_garbage() {
        assert!(Lexer::new("R1 a$b").tokenize().is_err());
    }
}
