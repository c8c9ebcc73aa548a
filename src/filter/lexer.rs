//! Tokenizer for the filter expression grammar.
//!
//! A single tokenize pass produces a flat `Vec<Token>`, then `next`/`peek`
//! walk over it. Quoted spans (`"has a space"`) are consumed whole so a
//! quoted value can contain whitespace, colons, or parentheses without
//! ending the token early.

use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub(crate) enum Token {
    Word(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(s) => write!(f, "{s}"),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Not => write!(f, "NOT"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::End => write!(f, "<END>"),
        }
    }
}

pub(crate) struct Lexer {
    tokens: Vec<Token>,
}

impl Lexer {
    pub(crate) fn new(input: &str) -> Self {
        let mut tokens = Self::tokenize(input);
        tokens.reverse();
        Self { tokens }
    }

    pub(crate) fn next(&mut self) -> Token {
        self.tokens.pop().unwrap_or(Token::End)
    }

    pub(crate) fn peek(&mut self) -> Token {
        self.tokens.last().cloned().unwrap_or(Token::End)
    }

    fn tokenize(input: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut buf = String::new();
        let mut in_quotes = false;

        let flush = |buf: &mut String, tokens: &mut Vec<Token>| {
            if buf.is_empty() {
                return;
            }
            let word = std::mem::take(buf);
            match word.to_uppercase().as_str() {
                "AND" => tokens.push(Token::And),
                "OR" => tokens.push(Token::Or),
                "NOT" => tokens.push(Token::Not),
                _ => tokens.push(Token::Word(word)),
            }
        };

        for c in input.chars() {
            if c == '"' {
                in_quotes = !in_quotes;
                continue;
            }
            if in_quotes {
                buf.push(c);
                continue;
            }
            match c {
                '(' => {
                    flush(&mut buf, &mut tokens);
                    tokens.push(Token::LParen);
                }
                ')' => {
                    flush(&mut buf, &mut tokens);
                    tokens.push(Token::RParen);
                }
                c if c.is_whitespace() => flush(&mut buf, &mut tokens),
                c => buf.push(c),
            }
        }
        flush(&mut buf, &mut tokens);
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_term() {
        let tokens = Lexer::tokenize("event_id: 1234");
        assert_eq!(
            tokens,
            vec![Token::Word("event_id:".into()), Token::Word("1234".into())]
        );
    }

    #[test]
    fn tokenizes_and_chain() {
        let tokens = Lexer::tokenize("winlog.event_id: 1234 AND winlog.provider_name: Test456");
        assert_eq!(
            tokens,
            vec![
                Token::Word("winlog.event_id:".into()),
                Token::Word("1234".into()),
                Token::And,
                Token::Word("winlog.provider_name:".into()),
                Token::Word("Test456".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_quoted_value_with_spaces() {
        let tokens = Lexer::tokenize(r#"message: "hello world""#);
        assert_eq!(
            tokens,
            vec![
                Token::Word("message:".into()),
                Token::Word("hello world".into())
            ]
        );
    }

    #[test]
    fn tokenizes_parens_and_not() {
        let tokens = Lexer::tokenize("(a: 1 OR b: 2) AND NOT c: 3");
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::Word("a:".into()),
                Token::Word("1".into()),
                Token::Or,
                Token::Word("b:".into()),
                Token::Word("2".into()),
                Token::RParen,
                Token::And,
                Token::Not,
                Token::Word("c:".into()),
                Token::Word("3".into()),
            ]
        );
    }
}
