//! Skip condition expressions over a task result.
//!
//! Conditions reference earlier answers through `steps.<id>[.answer][.path]`.
//! Step identifiers may be written locally (as authored inside their section);
//! they are looked up from the position of the step being evaluated, siblings
//! first and then each enclosing section outwards. Because identifiers contain
//! `.`, the longest identifier with a recorded result wins.
//!
//! Supported forms:
//!
//! - `left.includes(right)`: membership in an array
//! - `left == right` and `left != right`: comparison of rendered values
//! - `!expression`: negation of any of these forms
//! - bare `expression`: truthiness
//!
//! Operands are either JSON literals (`"yes"`, `3`, `true`, `["a","b"]`) or
//! `steps.*` references; anything else is taken as a bare string.

use serde_json::Value;
use taskflow_types::TaskResult;
use taskflow_types::identifier::qualified_candidates;

const STEPS_PREFIX: &str = "steps.";
const ANSWER_SEGMENT: &str = "answer";

/// Evaluates `expression` for the step `anchor` against `result`.
///
/// Unresolvable references evaluate to `null`, which is falsy and renders as
/// an empty string.
///
/// ```rust
/// use serde_json::json;
/// use taskflow_engine::navigation::condition::eval_condition;
/// use taskflow_types::{StepResult, TaskResult};
///
/// let result = TaskResult::new("survey")
///     .with_step_result(StepResult::new("intro.consent").with_answer(json!("no")));
///
/// assert!(eval_condition("steps.consent.answer == \"no\"", "intro.details", &result));
/// assert!(!eval_condition("steps.missing", "intro.details", &result));
/// ```
pub fn eval_condition(expression: &str, anchor: &str, result: &TaskResult) -> bool {
    let expression = expression.trim();
    if let Some(negated) = expression.strip_prefix('!') {
        return !eval_condition(negated, anchor, result);
    }
    if let Some(outcome) = evaluate_includes(expression, anchor, result) {
        return outcome;
    }
    if let Some(outcome) = evaluate_comparison(expression, anchor, result) {
        return outcome;
    }
    is_truthy(&resolve_operand(expression, anchor, result))
}

fn evaluate_includes(expression: &str, anchor: &str, result: &TaskResult) -> Option<bool> {
    let index = expression.find(".includes(")?;
    let (left, right_with_paren) = expression.split_at(index);
    let right = right_with_paren.trim_start_matches(".includes(").trim();
    let right = right.strip_suffix(')').unwrap_or(right).trim();

    let list = match resolve_operand(left, anchor, result) {
        Value::Array(items) => items,
        Value::String(text) if text.trim_start().starts_with('[') => serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|value| value.as_array().cloned())
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    let needle = format_json_value(&resolve_operand(right, anchor, result));
    Some(list.iter().any(|item| format_json_value(item) == needle))
}

fn evaluate_comparison(expression: &str, anchor: &str, result: &TaskResult) -> Option<bool> {
    let (position, negate) = match expression.find("!=") {
        Some(position) => (position, true),
        None => (expression.find("==")?, false),
    };
    let left = resolve_operand(&expression[..position], anchor, result);
    let right = resolve_operand(&expression[position + 2..], anchor, result);
    let equal = format_json_value(&left) == format_json_value(&right);
    Some(equal != negate)
}

fn resolve_operand(operand: &str, anchor: &str, result: &TaskResult) -> Value {
    let trimmed = operand.trim();
    if looks_like_literal(trimmed)
        && let Ok(value) = serde_json::from_str::<Value>(trimmed)
    {
        return value;
    }
    if let Some(reference) = trimmed.strip_prefix(STEPS_PREFIX) {
        return resolve_step_reference(reference, anchor, result).unwrap_or(Value::Null);
    }
    Value::String(trimmed.to_string())
}

fn looks_like_literal(operand: &str) -> bool {
    operand.starts_with('[')
        || operand.starts_with('{')
        || operand.starts_with('"')
        || operand.starts_with('-')
        || operand == "null"
        || operand == "true"
        || operand == "false"
        || operand.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Resolves `<id>[.answer][.path]` to the selected part of the latest answer.
fn resolve_step_reference(reference: &str, anchor: &str, result: &TaskResult) -> Option<Value> {
    let parts: Vec<&str> = reference.split('.').filter(|part| !part.is_empty()).collect();

    for split in (1..=parts.len()).rev() {
        let local = parts[..split].join(".");
        let Some(step_result) = qualified_candidates(anchor, &local)
            .iter()
            .find_map(|candidate| result.result_for(candidate))
        else {
            continue;
        };

        let mut path = &parts[split..];
        if path.first() == Some(&ANSWER_SEGMENT) {
            path = &path[1..];
        }
        return Some(navigate_json_path(&step_result.answer, path));
    }
    None
}

fn navigate_json_path(root: &Value, path: &[&str]) -> Value {
    let mut current = root;
    for part in path {
        current = match current {
            Value::Object(map) => map.get(*part).unwrap_or(&Value::Null),
            Value::Array(items) => match part.parse::<usize>() {
                Ok(index) => items.get(index).unwrap_or(&Value::Null),
                Err(_) => &Value::Null,
            },
            _ => &Value::Null,
        };
    }
    current.clone()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty() && text != "false" && text != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Strings render bare, `null` renders empty, everything else as JSON.
fn format_json_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
