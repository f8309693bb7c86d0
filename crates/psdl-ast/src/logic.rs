//! Logic rules: boolean combinations of trends and other rules
//!
//! A rule keeps its raw formula text, the term and connective lists in
//! source order, and a precedence-correct [`LogicNode`] tree. The tree is
//! the evaluation form; the lists are kept for reporting.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Boolean connectives in a logic formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicOp {
    And,
    Or,
    Not,
}

impl LogicOp {
    /// Match a keyword case-insensitively
    pub fn from_keyword(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("and") {
            Some(Self::And)
        } else if word.eq_ignore_ascii_case("or") {
            Some(Self::Or)
        } else if word.eq_ignore_ascii_case("not") {
            Some(Self::Not)
        } else {
            None
        }
    }

    /// Normalized (upper case) keyword
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }

    /// Binding strength: NOT > AND > OR
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Not => 3,
        }
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Boolean expression tree over term references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LogicNode {
    /// Reference to a trend or another logic rule
    Term { name: String },
    Not { operand: Box<LogicNode> },
    And { left: Box<LogicNode>, right: Box<LogicNode> },
    Or { left: Box<LogicNode>, right: Box<LogicNode> },
}

impl LogicNode {
    pub fn term(name: impl Into<String>) -> Self {
        Self::Term { name: name.into() }
    }

    pub fn not(operand: LogicNode) -> Self {
        Self::Not {
            operand: Box::new(operand),
        }
    }

    pub fn and(left: LogicNode, right: LogicNode) -> Self {
        Self::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: LogicNode, right: LogicNode) -> Self {
        Self::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Term names in left-to-right source order, duplicates kept
    pub fn terms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_terms(&mut out);
        out
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Term { name } => out.push(name),
            Self::Not { operand } => operand.collect_terms(out),
            Self::And { left, right } | Self::Or { left, right } => {
                left.collect_terms(out);
                right.collect_terms(out);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Term { .. } => 4,
            Self::Not { .. } => LogicOp::Not.precedence(),
            Self::And { .. } => LogicOp::And.precedence(),
            Self::Or { .. } => LogicOp::Or.precedence(),
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// Prints with the minimal parentheses needed to re-parse to the same tree
impl fmt::Display for LogicNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term { name } => f.write_str(name),
            Self::Not { operand } => {
                f.write_str("NOT ")?;
                operand.fmt_child(f, LogicOp::Not.precedence())
            }
            Self::And { left, right } => {
                let p = LogicOp::And.precedence();
                left.fmt_child(f, p)?;
                f.write_str(" AND ")?;
                right.fmt_child(f, p + 1)
            }
            Self::Or { left, right } => {
                let p = LogicOp::Or.precedence();
                left.fmt_child(f, p)?;
                f.write_str(" OR ")?;
                right.fmt_child(f, p + 1)
            }
        }
    }
}

/// Clinical severity attached to a logic rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named logic rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicExpr {
    /// Rule name (key in the scenario's `logic` section)
    pub name: String,
    /// Raw formula text as written
    pub expr: String,
    /// Referenced terms in source order, duplicates kept
    pub terms: SmallVec<[String; 4]>,
    /// Connectives in source order, upper-cased
    pub operators: SmallVec<[LogicOp; 4]>,
    /// Parsed boolean tree
    pub tree: LogicNode,
    pub severity: Option<Severity>,
    pub description: Option<String>,
}

impl LogicExpr {
    /// Build a rule from its formula text, its tree and its connective list
    pub fn new(
        name: impl Into<String>,
        expr: impl Into<String>,
        tree: LogicNode,
        operators: impl IntoIterator<Item = LogicOp>,
    ) -> Self {
        let terms = tree.terms().into_iter().map(str::to_string).collect();
        Self {
            name: name.into(),
            expr: expr.into(),
            terms,
            operators: operators.into_iter().collect(),
            tree,
            severity: None,
            description: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Distinct referenced term names, in first-occurrence order
    pub fn distinct_terms(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            if !seen.contains(&term.as_str()) {
                seen.push(term);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(LogicOp::from_keyword("and"), Some(LogicOp::And));
        assert_eq!(LogicOp::from_keyword("Or"), Some(LogicOp::Or));
        assert_eq!(LogicOp::from_keyword("NOT"), Some(LogicOp::Not));
        assert_eq!(LogicOp::from_keyword("nor"), None);
    }

    #[test]
    fn test_terms_in_source_order() {
        // (a AND b) OR NOT a
        let tree = LogicNode::or(
            LogicNode::and(LogicNode::term("a"), LogicNode::term("b")),
            LogicNode::not(LogicNode::term("a")),
        );
        assert_eq!(tree.terms(), vec!["a", "b", "a"]);

        let rule = LogicExpr::new("r", "a AND b OR NOT a", tree, [LogicOp::And, LogicOp::Or, LogicOp::Not]);
        assert_eq!(rule.distinct_terms(), vec!["a", "b"]);
        assert_eq!(rule.terms.len(), 3);
    }

    #[test]
    fn test_display_adds_only_needed_parentheses() {
        let flat = LogicNode::or(
            LogicNode::and(LogicNode::term("a"), LogicNode::term("b")),
            LogicNode::not(LogicNode::term("c")),
        );
        assert_eq!(flat.to_string(), "a AND b OR NOT c");

        let grouped = LogicNode::and(
            LogicNode::term("a"),
            LogicNode::or(LogicNode::term("b"), LogicNode::term("c")),
        );
        assert_eq!(grouped.to_string(), "a AND (b OR c)");

        let negated_group = LogicNode::not(LogicNode::and(LogicNode::term("a"), LogicNode::term("b")));
        assert_eq!(negated_group.to_string(), "NOT (a AND b)");
    }

    #[test]
    fn test_severity_names() {
        assert_eq!(Severity::from_name("HIGH"), Some(Severity::High));
        assert_eq!(Severity::from_name("urgent"), None);
        assert!(Severity::Critical > Severity::Low);
    }
}
