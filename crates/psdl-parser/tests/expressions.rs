//! Tests for trend and logic expression parsing
//!
//! Covers:
//! - Window tokens and every temporal operator
//! - Comparators and thresholds
//! - Invalid operator usage (missing window, percentile argument)
//! - Logic precedence, associativity and grouping
//! - Source-ordered term and connective lists

use psdl_ast::{Comparator, LogicNode, LogicOp, TemporalOp, WindowSpec};
use psdl_diagnostics::{PSDL0007, PSDL0008, PSDL0009, PSDL0010, PSDL0020};
use psdl_parser::{parse_logic_expression, parse_trend_expression};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn tree(text: &str) -> LogicNode {
    parse_logic_expression("rule", text)
        .unwrap_or_else(|e| panic!("Failed to parse '{}': {}", text, e))
        .tree
}

fn t(name: &str) -> LogicNode {
    LogicNode::term(name)
}

// === Trend expressions ===

#[rstest]
#[case("delta(Cr, 6h)", TemporalOp::Delta, Some(WindowSpec::hours(6)))]
#[case("slope(MAP, 30m)", TemporalOp::Slope, Some(WindowSpec::minutes(30)))]
#[case("ema(HR, 2h)", TemporalOp::Ema, Some(WindowSpec::hours(2)))]
#[case("sma(HR, 1h)", TemporalOp::Sma, Some(WindowSpec::hours(1)))]
#[case("min(SpO2, 90s)", TemporalOp::Min, Some(WindowSpec::seconds(90)))]
#[case("max(Temp, 1d)", TemporalOp::Max, Some(WindowSpec::days(1)))]
#[case("count(Lact, 24h)", TemporalOp::Count, Some(WindowSpec::hours(24)))]
#[case("last(Lact)", TemporalOp::Last, None)]
#[case("last(Lact, 12h)", TemporalOp::Last, Some(WindowSpec::hours(12)))]
#[case("first(Cr, 48h)", TemporalOp::First, Some(WindowSpec::hours(48)))]
#[case("std(HR, 4h)", TemporalOp::Std, Some(WindowSpec::hours(4)))]
#[case("stddev(HR, 4h)", TemporalOp::Std, Some(WindowSpec::hours(4)))]
fn test_operator_applications(
    #[case] text: &str,
    #[case] operator: TemporalOp,
    #[case] window: Option<WindowSpec>,
) {
    let trend = parse_trend_expression("t", text).unwrap();
    assert_eq!(trend.operator, operator);
    assert_eq!(trend.window, window);
    assert!(trend.threshold.is_none());
    assert!(trend.percentile.is_none());
}

#[rstest]
#[case("delta(Cr, 6h) > 0.3", Comparator::Greater, 0.3)]
#[case("delta(Cr, 6h) >= 0.3", Comparator::GreaterOrEqual, 0.3)]
#[case("min(SpO2, 1h) < 92", Comparator::Less, 92.0)]
#[case("min(SpO2, 1h) <= 92", Comparator::LessOrEqual, 92.0)]
#[case("count(Lact, 6h) == 0", Comparator::Equal, 0.0)]
#[case("count(Lact, 6h) != 0", Comparator::NotEqual, 0.0)]
#[case("slope(MAP, 2h) < -0.005", Comparator::Less, -0.005)]
fn test_comparisons(#[case] text: &str, #[case] comparator: Comparator, #[case] value: f64) {
    let trend = parse_trend_expression("t", text).unwrap();
    let threshold = trend.threshold.expect("boolean trend");
    assert_eq!(threshold.comparator, comparator);
    assert_eq!(threshold.value, value);
}

#[test]
fn test_whitespace_is_flexible() {
    let tight = parse_trend_expression("t", "delta(Cr,6h)>0.3").unwrap();
    let loose = parse_trend_expression("t", "  delta ( Cr ,  6h )  >  0.3  ").unwrap();
    assert_eq!(tight, loose);
    assert_eq!(tight.signal, "Cr");
}

#[test]
fn test_threshold_with_trailing_dot() {
    let trend = parse_trend_expression("t", "last(Cr) > 1.").unwrap();
    assert_eq!(trend.threshold.map(|th| th.value), Some(1.0));
}

#[test]
fn test_names_may_start_with_digits() {
    let trend = parse_trend_expression("24h_rise", "delta(12lead_qt, 24h) > 0.3").unwrap();
    assert_eq!(trend.signal, "12lead_qt");

    let rule = parse_logic_expression("x", "24h_rise AND b").unwrap();
    assert_eq!(rule.terms.to_vec(), vec!["24h_rise", "b"]);
    assert_eq!(rule.tree, LogicNode::and(t("24h_rise"), t("b")));
}

#[test]
fn test_percentile_takes_third_argument() {
    let trend = parse_trend_expression("p90", "percentile(HR, 1h, 90) > 120").unwrap();
    assert_eq!(trend.operator, TemporalOp::Percentile);
    assert_eq!(trend.window, Some(WindowSpec::hours(1)));
    assert_eq!(trend.percentile, Some(90.0));
    assert_eq!(trend.threshold.map(|t| t.value), Some(120.0));

    let median = parse_trend_expression("p50", "percentile(HR, 6h, 50.5)").unwrap();
    assert_eq!(median.percentile, Some(50.5));
}

#[rstest]
#[case::percentile_without_argument("percentile(HR, 1h)")]
#[case::percentile_without_window("percentile(HR)")]
#[case::percentile_out_of_range("percentile(HR, 1h, 101)")]
#[case::windowed_operator_without_window("delta(Cr)")]
#[case::extra_argument("sma(HR, 1h, 50)")]
fn test_invalid_operator_usage(#[case] text: &str) {
    let err = parse_trend_expression("t", text).unwrap_err();
    assert_eq!(err.code(), PSDL0020, "{}: {}", text, err);
}

#[rstest]
#[case::unknown_operator("median(HR, 1h)", PSDL0008)]
#[case::bad_unit("delta(Cr, 6w)", PSDL0007)]
#[case::zero_window("delta(Cr, 0h)", PSDL0007)]
#[case::negative_window("delta(Cr, -6h)", PSDL0007)]
#[case::single_equals("delta(Cr, 6h) = 0.3", PSDL0008)]
#[case::missing_threshold("delta(Cr, 6h) >", PSDL0010)]
#[case::missing_paren("delta(Cr, 6h > 0.3", PSDL0008)]
#[case::trailing_garbage("delta(Cr, 6h) > 0.3 mg", PSDL0008)]
#[case::empty("", PSDL0008)]
fn test_trend_syntax_errors(#[case] text: &str, #[case] code: psdl_diagnostics::ErrorCode) {
    let err = parse_trend_expression("t", text).unwrap_err();
    assert_eq!(err.code(), code, "{}: {}", text, err);
    assert!(err.is_syntax());
}

// === Logic expressions ===

#[test]
fn test_not_and_or_precedence() {
    // (A AND B) OR (NOT C)
    assert_eq!(
        tree("A AND B OR NOT C"),
        LogicNode::or(LogicNode::and(t("A"), t("B")), LogicNode::not(t("C")))
    );
}

#[test]
fn test_and_binds_tighter_than_or_on_either_side() {
    assert_eq!(
        tree("a OR b AND c OR d"),
        LogicNode::or(
            LogicNode::or(t("a"), LogicNode::and(t("b"), t("c"))),
            t("d")
        )
    );
}

#[test]
fn test_left_associative_chains() {
    assert_eq!(
        tree("a AND b AND c"),
        LogicNode::and(LogicNode::and(t("a"), t("b")), t("c"))
    );
}

#[test]
fn test_parentheses_override_precedence() {
    assert_eq!(
        tree("A AND (B OR NOT C)"),
        LogicNode::and(t("A"), LogicNode::or(t("B"), LogicNode::not(t("C"))))
    );
    assert_eq!(
        tree("NOT (a OR b)"),
        LogicNode::not(LogicNode::or(t("a"), t("b")))
    );
    assert_eq!(tree("((a))"), t("a"));
}

#[test]
fn test_grouping_keeps_source_order_lists() {
    let rule = parse_logic_expression("r", "(x OR y) AND NOT x").unwrap();
    assert_eq!(rule.terms.to_vec(), vec!["x", "y", "x"]);
    assert_eq!(
        rule.operators.to_vec(),
        vec![LogicOp::Or, LogicOp::And, LogicOp::Not]
    );
    assert_eq!(rule.distinct_terms(), vec!["x", "y"]);
    assert_eq!(rule.expr, "(x OR y) AND NOT x");
}

#[test]
fn test_keywords_are_case_insensitive() {
    let rule = parse_logic_expression("r", "a and b or not c").unwrap();
    assert_eq!(rule.operators.to_vec(), vec![LogicOp::And, LogicOp::Or, LogicOp::Not]);
    assert_eq!(rule.tree, tree("a AND b OR NOT c"));
}

#[test]
fn test_terms_may_contain_keywords_as_substrings() {
    let rule = parse_logic_expression("r", "android OR nothing AND order").unwrap();
    assert_eq!(rule.terms.to_vec(), vec!["android", "nothing", "order"]);
}

#[test]
fn test_display_round_trips_through_parser() {
    for text in ["A AND B OR NOT C", "a AND (b OR c)", "NOT (a AND b) OR c", "a OR b OR c"] {
        let first = tree(text);
        assert_eq!(tree(&first.to_string()), first, "{}", text);
    }
}

#[rstest]
#[case::empty("   ")]
#[case::dangling_and("a AND")]
#[case::leading_or("OR a")]
#[case::adjacent_terms("a b")]
#[case::unclosed("(a OR b")]
#[case::unbalanced("a OR b)")]
#[case::keyword_as_term("a AND not")]
#[case::symbol("a && b")]
fn test_logic_syntax_errors(#[case] text: &str) {
    let err = parse_logic_expression("r", text).unwrap_err();
    assert_eq!(err.code(), PSDL0009, "{}: {}", text, err);
}

#[test]
fn test_excessive_nesting_is_an_error() {
    let text = format!("{}a{}", "(".repeat(300), ")".repeat(300));
    let err = parse_logic_expression("r", &text).unwrap_err();
    assert_eq!(err.code(), PSDL0009);
}
