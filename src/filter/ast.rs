//! Pratt parser over the filter-expression token stream.
//!
//! `OR` binds loosest, `AND` next, `NOT` is a prefix operator applied to a
//! single primary term.

use super::lexer::{Lexer, Token};
use crate::error::FilterParseError;
use crate::event::Event;
use crate::value::Value;
use regex::Regex;
use std::hash::{Hash, Hasher};

const BP_OR: u8 = 1;
const BP_AND: u8 = 2;

/// A parsed filter expression.
///
/// Equality and hashing are by content, including the source text of any
/// regex term, since `regex::Regex` itself implements neither.
#[derive(Debug, Clone)]
pub enum FilterExpression {
    And(Box<FilterExpression>, Box<FilterExpression>),
    Or(Box<FilterExpression>, Box<FilterExpression>),
    Not(Box<FilterExpression>),
    Equals(String, Value),
    Matches(String, Regex),
}

impl FilterExpression {
    pub fn parse(input: &str) -> Result<Self, FilterParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FilterParseError::Empty);
        }
        let mut lexer = Lexer::new(trimmed);
        let expr = parse_expr(&mut lexer, 0)?;
        match lexer.next() {
            Token::End => Ok(expr),
            other => Err(FilterParseError::UnexpectedToken(other.to_string())),
        }
    }

    /// Evaluate against an event, walking dotted-path lookups for each term.
    pub fn evaluate(&self, event: &Event) -> bool {
        match self {
            FilterExpression::And(a, b) => a.evaluate(event) && b.evaluate(event),
            FilterExpression::Or(a, b) => a.evaluate(event) || b.evaluate(event),
            FilterExpression::Not(inner) => !inner.evaluate(event),
            FilterExpression::Equals(path, value) => event
                .get(path)
                .and_then(|v| v.as_scalar())
                .is_some_and(|v| v == value),
            FilterExpression::Matches(path, re) => event
                .get_str(path)
                .is_some_and(|s| re.is_match(s)),
        }
    }

    /// Every dotted field path this expression references. Used by the rule
    /// tree to pick an index key (the first `FieldEquals` conjunct found in
    /// a pure-conjunction expression) per the indexing design.
    pub fn first_equals_conjunct(&self) -> Option<(&str, &Value)> {
        match self {
            FilterExpression::Equals(path, value) => Some((path.as_str(), value)),
            FilterExpression::And(a, b) => a
                .first_equals_conjunct()
                .or_else(|| b.first_equals_conjunct()),
            _ => None,
        }
    }

    /// True if this expression is a pure conjunction of `Equals`/`Matches`
    /// terms with no `Or`/`Not` anywhere — the rule tree can index these,
    /// everything else falls back to a linear scan.
    pub fn is_pure_conjunction(&self) -> bool {
        match self {
            FilterExpression::Equals(_, _) | FilterExpression::Matches(_, _) => true,
            FilterExpression::And(a, b) => a.is_pure_conjunction() && b.is_pure_conjunction(),
            FilterExpression::Or(_, _) | FilterExpression::Not(_) => false,
        }
    }
}

impl PartialEq for FilterExpression {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FilterExpression::And(a1, b1), FilterExpression::And(a2, b2)) => a1 == a2 && b1 == b2,
            (FilterExpression::Or(a1, b1), FilterExpression::Or(a2, b2)) => a1 == a2 && b1 == b2,
            (FilterExpression::Not(a), FilterExpression::Not(b)) => a == b,
            (FilterExpression::Equals(p1, v1), FilterExpression::Equals(p2, v2)) => {
                p1 == p2 && v1 == v2
            }
            (FilterExpression::Matches(p1, r1), FilterExpression::Matches(p2, r2)) => {
                p1 == p2 && r1.as_str() == r2.as_str()
            }
            _ => false,
        }
    }
}

impl Eq for FilterExpression {}

impl Hash for FilterExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            FilterExpression::And(a, b) => {
                0u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            FilterExpression::Or(a, b) => {
                1u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            FilterExpression::Not(a) => {
                2u8.hash(state);
                a.hash(state);
            }
            FilterExpression::Equals(p, v) => {
                3u8.hash(state);
                p.hash(state);
                v.hash(state);
            }
            FilterExpression::Matches(p, r) => {
                4u8.hash(state);
                p.hash(state);
                r.as_str().hash(state);
            }
        }
    }
}

impl std::str::FromStr for FilterExpression {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterExpression::parse(s)
    }
}

fn parse_expr(lexer: &mut Lexer, min_bp: u8) -> Result<FilterExpression, FilterParseError> {
    let mut lhs = parse_prefix(lexer)?;

    loop {
        let bp = match lexer.peek() {
            Token::And => BP_AND,
            Token::Or => BP_OR,
            _ => break,
        };
        if bp < min_bp {
            break;
        }
        let op = lexer.next();
        let rhs = parse_expr(lexer, bp + 1)?;
        lhs = match op {
            Token::And => FilterExpression::And(Box::new(lhs), Box::new(rhs)),
            Token::Or => FilterExpression::Or(Box::new(lhs), Box::new(rhs)),
            _ => unreachable!(),
        };
    }

    Ok(lhs)
}

fn parse_prefix(lexer: &mut Lexer) -> Result<FilterExpression, FilterParseError> {
    match lexer.peek() {
        Token::Not => {
            lexer.next();
            let inner = parse_expr(lexer, BP_AND + 1)?;
            Ok(FilterExpression::Not(Box::new(inner)))
        }
        Token::LParen => {
            lexer.next();
            let inner = parse_expr(lexer, 0)?;
            match lexer.next() {
                Token::RParen => Ok(inner),
                _ => Err(FilterParseError::MissingClosingParenthesis),
            }
        }
        Token::Word(_) => parse_term(lexer),
        other => Err(FilterParseError::UnexpectedToken(other.to_string())),
    }
}

fn parse_term(lexer: &mut Lexer) -> Result<FilterExpression, FilterParseError> {
    let word = match lexer.next() {
        Token::Word(w) => w,
        other => return Err(FilterParseError::UnexpectedToken(other.to_string())),
    };

    let (field_part, mut value_part) = match word.split_once(':') {
        Some((field, rest)) => (field.to_string(), rest.to_string()),
        None => return Err(FilterParseError::MissingValue(word)),
    };

    // `field: value` (space after colon) leaves the value in the next token.
    if value_part.is_empty() {
        match lexer.next() {
            Token::Word(w) => value_part = w,
            other => return Err(FilterParseError::UnexpectedToken(other.to_string())),
        }
    }

    let (path, is_regex) = match field_part.rsplit_once('|') {
        Some((path, modifier)) if modifier.eq_ignore_ascii_case("re") => (path.to_string(), true),
        _ => (field_part, false),
    };

    if is_regex {
        let re = Regex::new(&value_part)
            .map_err(|e| FilterParseError::InvalidRegex(value_part.clone(), e))?;
        Ok(FilterExpression::Matches(path, re))
    } else {
        Ok(FilterExpression::Equals(path, Value::coerce(&value_part)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_term() {
        let expr = FilterExpression::parse("event_id: 1234").unwrap();
        assert_eq!(expr, FilterExpression::Equals("event_id".into(), Value::Int(1234)));
    }

    #[test]
    fn parses_and_binds_tighter_than_or() {
        // `a OR b AND c` should parse as `a OR (b AND c)`.
        let expr = FilterExpression::parse("a: 1 OR b: 2 AND c: 3").unwrap();
        let expected = FilterExpression::Or(
            Box::new(FilterExpression::Equals("a".into(), Value::Int(1))),
            Box::new(FilterExpression::And(
                Box::new(FilterExpression::Equals("b".into(), Value::Int(2))),
                Box::new(FilterExpression::Equals("c".into(), Value::Int(3))),
            )),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn parses_parens_override_precedence() {
        let expr = FilterExpression::parse("(a: 1 OR b: 2) AND c: 3").unwrap();
        let expected = FilterExpression::And(
            Box::new(FilterExpression::Or(
                Box::new(FilterExpression::Equals("a".into(), Value::Int(1))),
                Box::new(FilterExpression::Equals("b".into(), Value::Int(2))),
            )),
            Box::new(FilterExpression::Equals("c".into(), Value::Int(3))),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn parses_not_prefix() {
        let expr = FilterExpression::parse("NOT a: 1").unwrap();
        assert_eq!(
            expr,
            FilterExpression::Not(Box::new(FilterExpression::Equals("a".into(), Value::Int(1))))
        );
    }

    #[test]
    fn parses_regex_modifier() {
        let expr = FilterExpression::parse(r#"message|re: "^foo.*bar$""#).unwrap();
        match expr {
            FilterExpression::Matches(path, re) => {
                assert_eq!(path, "message");
                assert_eq!(re.as_str(), "^foo.*bar$");
            }
            other => panic!("expected Matches, got {other:?}"),
        }
    }

    #[test]
    fn evaluates_against_event() {
        let event = Event::from([("event_id", 1234i64)]);
        let expr = FilterExpression::parse("event_id: 1234").unwrap();
        assert!(expr.evaluate(&event));

        let expr = FilterExpression::parse("event_id: 9999").unwrap();
        assert!(!expr.evaluate(&event));
    }

    #[test]
    fn is_pure_conjunction_detection() {
        let conj = FilterExpression::parse("a: 1 AND b: 2").unwrap();
        assert!(conj.is_pure_conjunction());

        let disj = FilterExpression::parse("a: 1 OR b: 2").unwrap();
        assert!(!disj.is_pure_conjunction());

        let negated = FilterExpression::parse("NOT a: 1").unwrap();
        assert!(!negated.is_pure_conjunction());
    }

    #[test]
    fn missing_closing_paren_errors() {
        let err = FilterExpression::parse("(a: 1 AND b: 2").unwrap_err();
        assert!(matches!(err, FilterParseError::MissingClosingParenthesis));
    }

    #[test]
    fn empty_expression_errors() {
        assert!(matches!(FilterExpression::parse("   ").unwrap_err(), FilterParseError::Empty));
    }
}
