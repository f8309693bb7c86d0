//! Lexical building blocks shared by the trend and logic grammars

use psdl_ast::{Comparator, WindowUnit};
use winnow::ascii::{digit0, digit1, multispace0};
use winnow::combinator::{alt, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, literal, take_while};

pub(crate) type Input<'a> = &'a str;
pub(crate) type PResult<O> = Result<O, ErrMode<ContextError>>;

/// Skip whitespace
pub(crate) fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.void().parse_next(input)
}

/// Exact literal with the crate error type fixed
pub(crate) fn lit<'a>(s: &'static str) -> impl Parser<Input<'a>, &'a str, ErrMode<ContextError>> {
    literal(s)
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `[A-Za-z0-9_]+`, so names such as `24h_rise` are allowed
pub(crate) fn identifier<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    take_while(1.., is_ident_char).parse_next(input)
}

/// A case-insensitive keyword that is not the prefix of a longer identifier
pub(crate) fn keyword<'a>(word: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| {
        let cp = *input;
        let ident = identifier(input)?;
        if ident.eq_ignore_ascii_case(word) {
            Ok(ident)
        } else {
            *input = cp;
            Err(ErrMode::Backtrack(ContextError::new()))
        }
    }
}

fn decimal_text<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (opt('-'), digit1, opt(('.', digit0))).take().parse_next(input)
}

/// Signed decimal literal such as `0.3`, `-5` or `120`
pub(crate) fn number(input: &mut Input<'_>) -> PResult<f64> {
    let text = decimal_text(input)?;
    text.parse::<f64>()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

/// Unsigned integer that fits in `u32`
pub(crate) fn magnitude(input: &mut Input<'_>) -> PResult<u32> {
    digit1.parse_to::<u32>().parse_next(input)
}

pub(crate) fn window_unit(input: &mut Input<'_>) -> PResult<WindowUnit> {
    any.verify_map(WindowUnit::from_char).parse_next(input)
}

/// One of `<= >= == != < >`, longest match first
pub(crate) fn comparator(input: &mut Input<'_>) -> PResult<Comparator> {
    alt((lit("<="), lit(">="), lit("=="), lit("!="), lit("<"), lit(">")))
        .verify_map(Comparator::from_symbol)
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_stops_at_punctuation() {
        let mut input = "cr_rise2)";
        assert_eq!(identifier(&mut input).unwrap(), "cr_rise2");
        assert_eq!(input, ")");

        let mut digit_first = "24h_rise AND b";
        assert_eq!(identifier(&mut digit_first).unwrap(), "24h_rise");

        let mut punct = "(a";
        assert!(identifier(&mut punct).is_err());
    }

    #[test]
    fn test_keyword_respects_word_boundary() {
        let mut input = "android";
        assert!(keyword("and")(&mut input).is_err());
        assert_eq!(input, "android");

        let mut input = "And x";
        assert_eq!(keyword("and")(&mut input).unwrap(), "And");
        assert_eq!(input, " x");
    }

    #[test]
    fn test_number_forms() {
        for (text, expected) in [("0.3", 0.3), ("-5", -5.0), ("120", 120.0), ("1.25", 1.25), ("1.", 1.0)] {
            let mut input = text;
            assert_eq!(number(&mut input).unwrap(), expected);
            assert!(input.is_empty());
        }
        let mut bare_dot = ".5";
        assert!(number(&mut bare_dot).is_err());
    }

    #[test]
    fn test_comparator_longest_match() {
        let mut input = ">= 4";
        assert_eq!(comparator(&mut input).unwrap(), Comparator::GreaterOrEqual);
        assert_eq!(input, " 4");

        let mut single_eq = "= 4";
        assert!(comparator(&mut single_eq).is_err());
    }
}
