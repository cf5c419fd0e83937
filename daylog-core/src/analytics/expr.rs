//! Arithmetic expressions over metric values.
//!
//! Calculated metrics carry an expression such as `(steps / 1000) + walk`.
//! Evaluation runs in three stages: tokenize, convert to postfix with the
//! shunting-yard algorithm, then evaluate the postfix stack. Every failure
//! (bad token, unbalanced parentheses, unknown or missing identifier,
//! division by zero, non-finite result) collapses to `None`.

use std::collections::{BTreeMap, HashMap};

use crate::types::{LogEntry, MetricConfig, MetricType};

/// Values an expression can reference, keyed by `metric_id`.
///
/// `None` means "known metric with no value today"; referencing it makes the
/// whole expression evaluate to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericContext {
    values: HashMap<String, Option<f64>>,
}

impl NumericContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context for one day from that day's log rows.
    ///
    /// Checkboxes resolve to `1` when a truthy row exists and `0` otherwise,
    /// so an unchecked box still participates in arithmetic. Other types
    /// resolve to their logged value, or `None` when nothing was logged.
    pub fn from_day(metrics: &[MetricConfig], logs: &[LogEntry]) -> Self {
        let logged: HashMap<&str, f64> = logs
            .iter()
            .map(|l| (l.metric_id.as_str(), l.value))
            .collect();

        let values = metrics
            .iter()
            .map(|m| {
                let value = match m.metric_type {
                    MetricType::Checkbox => {
                        let on = logged
                            .get(m.metric_id.as_str())
                            .is_some_and(|v| *v != 0.0 && !v.is_nan());
                        Some(if on { 1.0 } else { 0.0 })
                    }
                    _ => logged
                        .get(m.metric_id.as_str())
                        .copied()
                        .filter(|v| v.is_finite()),
                };
                (m.metric_id.clone(), value)
            })
            .collect();

        Self { values }
    }

    pub fn set(&mut self, metric_id: impl Into<String>, value: Option<f64>) {
        self.values.insert(metric_id.into(), value);
    }

    /// Value for an identifier; `None` for unknown ids and null values alike.
    pub fn get(&self, metric_id: &str) -> Option<f64> {
        self.values.get(metric_id).copied().flatten()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<f64>)> for NumericContext {
    fn from_iter<T: IntoIterator<Item = (K, Option<f64>)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn precedence(self) -> u8 {
        match self {
            Op::Mul | Op::Div => 2,
            Op::Add | Op::Sub => 1,
        }
    }

    fn apply(self, a: f64, b: f64) -> Option<f64> {
        let result = match self {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            Op::Div => {
                if b == 0.0 {
                    return None;
                }
                a / b
            }
        };
        result.is_finite().then_some(result)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(Op),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let chars: Vec<char> = s.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Op(Op::Add));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Op(Op::Sub));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Op(Op::Mul));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Op(Op::Div));
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let value: f64 = raw.parse().ok()?;
                if !value.is_finite() {
                    return None;
                }
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => return None,
        }
    }

    Some(tokens)
}

/// Shunting-yard: infix tokens to postfix. Parentheses never reach the output.
fn to_postfix(tokens: Vec<Token>) -> Option<Vec<Token>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(_) | Token::Ident(_) => output.push(token),
            Token::Op(op) => {
                while let Some(&Token::Op(top)) = stack.last() {
                    if top.precedence() >= op.precedence() {
                        output.push(Token::Op(top));
                        stack.pop();
                    } else {
                        break;
                    }
                }
                stack.push(Token::Op(op));
            }
            Token::LParen => stack.push(Token::LParen),
            Token::RParen => loop {
                match stack.pop()? {
                    Token::LParen => break,
                    other => output.push(other),
                }
            },
        }
    }

    while let Some(top) = stack.pop() {
        if top == Token::LParen {
            return None;
        }
        output.push(top);
    }

    Some(output)
}

fn eval_postfix(postfix: &[Token], ctx: &NumericContext) -> Option<f64> {
    let mut stack: Vec<f64> = Vec::new();

    for token in postfix {
        match token {
            Token::Number(n) => stack.push(*n),
            Token::Ident(name) => stack.push(ctx.get(name)?),
            Token::Op(op) => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                stack.push(op.apply(a, b)?);
            }
            Token::LParen | Token::RParen => return None,
        }
    }

    match stack.as_slice() {
        [result] if result.is_finite() => Some(*result),
        _ => None,
    }
}

/// Evaluate a calculated-metric expression against a value context.
///
/// Supports numeric literals, metric identifiers, `+ - * /` (usual
/// precedence, left associative) and parentheses. There is no unary minus.
pub fn eval_calc_expr(expr: &str, ctx: &NumericContext) -> Option<f64> {
    let tokens = tokenize(expr)?;
    let postfix = to_postfix(tokens)?;
    eval_postfix(&postfix, ctx)
}

/// Evaluate every active calculated metric against `ctx`.
///
/// Metrics flagged as calculated but with a blank expression are skipped.
pub fn calculated_values(
    metrics: &[MetricConfig],
    ctx: &NumericContext,
) -> BTreeMap<String, Option<f64>> {
    metrics
        .iter()
        .filter(|m| m.active)
        .filter_map(|m| {
            let expr = m.expression()?;
            let value = eval_calc_expr(expr, ctx);
            if value.is_none() {
                tracing::warn!(metric_id = %m.metric_id, expr, "Calculated metric has no value");
            }
            Some((m.metric_id.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::types::NewMetric;

    fn ctx(pairs: &[(&str, Option<f64>)]) -> NumericContext {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn config(id: &str, metric_type: MetricType) -> MetricConfig {
        NewMetric::new(id, id, metric_type).into()
    }

    #[test]
    fn test_precedence() {
        let empty = NumericContext::new();
        assert_eq!(eval_calc_expr("2 + 3 * 4", &empty), Some(14.0));
        assert_eq!(eval_calc_expr("(2 + 3) * 4", &empty), Some(20.0));
        assert_eq!(eval_calc_expr("10 - 4 - 3", &empty), Some(3.0));
        assert_eq!(eval_calc_expr("8 / 4 / 2", &empty), Some(1.0));
    }

    #[test]
    fn test_identifiers() {
        let c = ctx(&[("a", Some(5.0)), ("b", Some(2.0)), ("c", None)]);
        assert_eq!(eval_calc_expr("a / b", &c), Some(2.5));
        assert_eq!(eval_calc_expr("a * 0.5 + .5", &c), Some(3.0));
        assert_eq!(eval_calc_expr("a + c", &c), None);
        assert_eq!(eval_calc_expr("a + unknown", &c), None);
    }

    #[test]
    fn test_division_by_zero() {
        let c = ctx(&[("x", Some(5.0))]);
        assert_eq!(eval_calc_expr("x / 0", &c), None);
        assert_eq!(eval_calc_expr("x / (x - 5)", &c), None);
    }

    #[test]
    fn test_malformed_expressions() {
        let empty = NumericContext::new();
        for expr in ["", "   ", "1 +", "* 2", "(1 + 2", "1 + 2)", "1 2", "1.2.3", "2 ^ 3", "-1", "a$"] {
            assert_eq!(eval_calc_expr(expr, &empty), None, "expr {:?}", expr);
        }
    }

    #[test]
    fn test_huge_intermediate_is_rejected() {
        let c = ctx(&[("big", Some(f64::MAX))]);
        assert_eq!(eval_calc_expr("big * 10", &c), None);
    }

    #[test]
    fn test_non_finite_binding_is_rejected() {
        let c = ctx(&[("x", Some(f64::INFINITY)), ("n", Some(f64::NAN)), ("ok", Some(2.0))]);
        assert_eq!(eval_calc_expr("x", &c), None);
        assert_eq!(eval_calc_expr("(x)", &c), None);
        assert_eq!(eval_calc_expr("n", &c), None);
        assert_eq!(eval_calc_expr("x + 0", &c), None);
        assert_eq!(eval_calc_expr("ok", &c), Some(2.0));
    }

    #[test]
    fn test_context_from_day() {
        let date = parse_date("2024-03-01").unwrap();
        let metrics = vec![
            config("walk", MetricType::Checkbox),
            config("gym", MetricType::Checkbox),
            config("steps", MetricType::Number),
            config("bed", MetricType::Hhmm),
        ];
        let logs = vec![
            LogEntry::new(date, "walk", 1.0),
            LogEntry::new(date, "steps", 4200.0),
        ];

        let c = NumericContext::from_day(&metrics, &logs);
        assert_eq!(c.get("walk"), Some(1.0));
        assert_eq!(c.get("gym"), Some(0.0));
        assert_eq!(c.get("steps"), Some(4200.0));
        assert_eq!(c.get("bed"), None);
    }

    #[test]
    fn test_calculated_values() {
        let mut km = config("km", MetricType::Number);
        km.is_calculated = true;
        km.calc_expr = Some("steps / 1300".to_string());
        let mut blank = config("blank", MetricType::Number);
        blank.is_calculated = true;
        blank.calc_expr = Some("  ".to_string());
        let metrics = vec![config("steps", MetricType::Number), km, blank];

        let values = calculated_values(&metrics, &ctx(&[("steps", Some(2600.0))]));
        assert_eq!(values.len(), 1);
        assert_eq!(values["km"], Some(2.0));

        let values = calculated_values(&metrics, &ctx(&[("steps", None)]));
        assert_eq!(values["km"], None);
    }
}
