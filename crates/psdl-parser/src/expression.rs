//! Trend and logic expression grammars
//!
//! Trend expressions are a single operator application with an optional
//! comparison. Logic expressions are parsed by precedence climbing into a
//! [`LogicNode`] tree (`NOT` > `AND` > `OR`, left-associative, parentheses
//! override), while the connectives are also collected in source order.

use crate::combinators::{
    comparator, identifier, keyword, lit, magnitude, number, window_unit, ws, Input, PResult,
};
use psdl_ast::{LogicExpr, LogicNode, LogicOp, TemporalOp, TrendExpr, WindowSpec};
use psdl_diagnostics::{
    ErrorCode, PsdlError, Result, Span, PSDL0007, PSDL0008, PSDL0009, PSDL0010, PSDL0020,
};
use smallvec::SmallVec;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;

/// Walks one expression string and turns winnow failures into located errors
struct Cursor<'s> {
    source: &'s str,
    input: Input<'s>,
}

impl<'s> Cursor<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            input: source,
        }
    }

    fn offset(&self) -> usize {
        self.source.len() - self.input.len()
    }

    fn skip_ws(&mut self) {
        let _ = ws(&mut self.input);
    }

    fn at_end(&self) -> bool {
        self.input.is_empty()
    }

    fn peek_char(&self) -> Option<char> {
        self.input.chars().next()
    }

    /// Run `parser`, restoring the position on failure
    fn attempt<O>(&mut self, mut parser: impl Parser<Input<'s>, O, ErrMode<ContextError>>) -> Option<O> {
        let cp = self.input;
        match parser.parse_next(&mut self.input) {
            Ok(out) => Some(out),
            Err(_) => {
                self.input = cp;
                None
            }
        }
    }

    fn expect<O>(
        &mut self,
        parser: impl Parser<Input<'s>, O, ErrMode<ContextError>>,
        code: ErrorCode,
        what: &str,
    ) -> Result<O> {
        self.attempt(parser)
            .ok_or_else(|| self.error(code, format!("Expected {}", what)))
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>) -> PsdlError {
        self.error_at(code, message, self.offset())
    }

    fn error_at(&self, code: ErrorCode, message: impl Into<String>, at: usize) -> PsdlError {
        let end = self.source[at..]
            .chars()
            .next()
            .map_or(at, |c| at + c.len_utf8());
        PsdlError::parse_at(code, message, self.source, Span::new(at, end))
    }
}

fn window(input: &mut Input<'_>) -> PResult<Option<WindowSpec>> {
    let value = magnitude(input)?;
    let unit = window_unit(input)?;
    Ok(WindowSpec::new(value, unit))
}

fn expect_window(cursor: &mut Cursor<'_>) -> Result<WindowSpec> {
    let start = cursor.offset();
    match cursor.attempt(window) {
        Some(Some(spec)) => Ok(spec),
        Some(None) => Err(cursor.error_at(PSDL0007, "Window magnitude must be greater than zero", start)),
        None => Err(cursor.error_at(
            PSDL0007,
            "Invalid window: expected <integer><unit> with unit one of s, m, h, d",
            start,
        )),
    }
}

/// Parse a standalone window token such as `6h`
pub fn parse_window(text: &str) -> Result<WindowSpec> {
    let mut cursor = Cursor::new(text.trim());
    let spec = expect_window(&mut cursor)?;
    if !cursor.at_end() {
        return Err(cursor.error(PSDL0007, format!("Invalid window specification '{}'", text.trim())));
    }
    Ok(spec)
}

/// Parse a trend expression: `op(signal[, window][, p]) [cmp number]`
pub fn parse_trend_expression(name: &str, text: &str) -> Result<TrendExpr> {
    let mut cursor = Cursor::new(text.trim());

    let op_start = cursor.offset();
    let op_name = cursor.expect(identifier, PSDL0008, "a temporal operator")?;
    let operator = TemporalOp::from_name(op_name).ok_or_else(|| {
        cursor.error_at(PSDL0008, format!("Unknown temporal operator '{}'", op_name), op_start)
    })?;

    cursor.skip_ws();
    cursor.expect(lit("("), PSDL0008, "'(' after operator")?;
    cursor.skip_ws();
    let signal = cursor.expect(identifier, PSDL0008, "a signal name")?.to_string();
    cursor.skip_ws();

    let mut args_start = cursor.offset();
    let window = if cursor.attempt(lit(",")).is_some() {
        cursor.skip_ws();
        args_start = cursor.offset();
        let spec = expect_window(&mut cursor)?;
        cursor.skip_ws();
        Some(spec)
    } else {
        None
    };

    let percentile = if operator.takes_percentile() {
        if window.is_none() || cursor.attempt(lit(",")).is_none() {
            return Err(cursor.error_at(
                PSDL0020,
                "percentile requires a window and a percentile argument, e.g. percentile(HR, 1h, 90)",
                args_start,
            ));
        }
        cursor.skip_ws();
        let p_start = cursor.offset();
        let p = cursor.expect(number, PSDL0010, "a percentile between 0 and 100")?;
        if !(0.0..=100.0).contains(&p) {
            return Err(cursor.error_at(
                PSDL0020,
                format!("Percentile must be between 0 and 100, got {}", p),
                p_start,
            ));
        }
        cursor.skip_ws();
        Some(p)
    } else {
        if cursor.peek_char() == Some(',') {
            return Err(cursor.error(
                PSDL0020,
                format!("'{}' takes at most a signal and a window", operator),
            ));
        }
        None
    };

    if window.is_none() && operator.requires_window() {
        return Err(cursor.error_at(
            PSDL0020,
            format!("'{}' requires a window, e.g. {}({}, 6h)", operator, operator, signal),
            args_start,
        ));
    }

    cursor.expect(lit(")"), PSDL0008, "')'")?;
    cursor.skip_ws();

    let mut trend = TrendExpr::new(name, operator, signal, window);
    trend.percentile = percentile;

    if !cursor.at_end() {
        let cmp = cursor.expect(comparator, PSDL0008, "a comparator (<, >, <=, >=, ==, !=)")?;
        cursor.skip_ws();
        let threshold = cursor.expect(number, PSDL0010, "a numeric threshold")?;
        cursor.skip_ws();
        trend = trend.with_threshold(cmp, threshold);
    }

    if !cursor.at_end() {
        return Err(cursor.error(PSDL0008, "Unexpected trailing input in trend expression"));
    }

    Ok(trend)
}

/// Deepest run of nested `(` and `NOT` a logic formula may contain
pub const MAX_LOGIC_NESTING: usize = 256;

/// Parse a logic formula such as `cr_rise AND (lactate_high OR NOT stable)`
pub fn parse_logic_expression(name: &str, text: &str) -> Result<LogicExpr> {
    let mut parser = LogicParser {
        cursor: Cursor::new(text),
        operators: SmallVec::new(),
        depth: 0,
    };

    parser.cursor.skip_ws();
    if parser.cursor.at_end() {
        return Err(parser.cursor.error(PSDL0009, format!("Logic '{}' has an empty expression", name)));
    }

    let tree = parser.expression(0)?;
    parser.cursor.skip_ws();
    if !parser.cursor.at_end() {
        let message = if parser.cursor.peek_char() == Some(')') {
            "Unbalanced ')' in logic expression".to_string()
        } else {
            "Expected AND or OR between terms".to_string()
        };
        return Err(parser.cursor.error(PSDL0009, message));
    }

    Ok(LogicExpr::new(name, text, tree, parser.operators))
}

struct LogicParser<'s> {
    cursor: Cursor<'s>,
    operators: SmallVec<[LogicOp; 4]>,
    depth: usize,
}

impl LogicParser<'_> {
    /// Precedence climbing over the binary connectives
    fn expression(&mut self, min_precedence: u8) -> Result<LogicNode> {
        let mut left = self.unary()?;

        loop {
            self.cursor.skip_ws();
            let cp = self.cursor.input;
            let op = if self.cursor.attempt(keyword("and")).is_some() {
                LogicOp::And
            } else if self.cursor.attempt(keyword("or")).is_some() {
                LogicOp::Or
            } else {
                break;
            };

            let precedence = op.precedence();
            if precedence < min_precedence {
                // Hand the connective back to the caller's loop
                self.cursor.input = cp;
                break;
            }

            self.operators.push(op);
            let right = self.expression(precedence + 1)?;
            left = match op {
                LogicOp::And => LogicNode::and(left, right),
                _ => LogicNode::or(left, right),
            };
        }

        Ok(left)
    }

    /// Enter one `(` or `NOT` level
    fn descend(&mut self, at: usize) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_LOGIC_NESTING {
            return Err(self.cursor.error_at(
                PSDL0009,
                format!("Logic expression nests deeper than {} levels", MAX_LOGIC_NESTING),
                at,
            ));
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<LogicNode> {
        self.cursor.skip_ws();

        let start = self.cursor.offset();
        if self.cursor.attempt(keyword("not")).is_some() {
            self.descend(start)?;
            self.operators.push(LogicOp::Not);
            let operand = self.unary()?;
            self.depth -= 1;
            return Ok(LogicNode::not(operand));
        }

        if self.cursor.attempt(lit("(")).is_some() {
            let open = start;
            self.descend(open)?;
            let inner = self.expression(0)?;
            self.depth -= 1;
            self.cursor.skip_ws();
            if self.cursor.attempt(lit(")")).is_none() {
                return Err(self.cursor.error_at(PSDL0009, "Unclosed '(' in logic expression", open));
            }
            return Ok(inner);
        }

        let term = self.cursor.attempt(identifier).ok_or_else(|| {
            if self.cursor.at_end() {
                self.cursor.error(PSDL0009, "Logic expression ends where a term was expected")
            } else {
                self.cursor.error(PSDL0009, "Expected a term name, NOT, or '('")
            }
        })?;
        if LogicOp::from_keyword(term).is_some() {
            return Err(self.cursor.error_at(
                PSDL0009,
                format!("Unexpected keyword '{}' where a term was expected", term.to_uppercase()),
                start,
            ));
        }
        Ok(LogicNode::term(term))
    }
}
