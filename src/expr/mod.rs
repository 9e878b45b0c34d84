// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Condition expression engine
//!
//! Builds the boolean expressions used in job `if:` conditions and gating
//! outputs. Expressions are trees of [`ConditionNode`] created only through
//! the functions in this module and rendered deterministically, so two
//! compilations of the same workflow always produce identical conditions.
//!
//! AND/OR chains are flattened when rendered and every operand is kept
//! whole inside its own parentheses:
//!
//! ```text
//! (steps.check_stop_time.outputs.stop_time_ok == 'true') && (steps.check_command_position.outputs.command_position_ok == 'true')
//! ```

mod node;

pub use node::{ComparisonOp, ConditionNode};

use node::Node;
use thiserror::Error;

use crate::errors::FlowgateError;

/// Errors raised by expression builders
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("cannot build a conjunction from zero conditions")]
    EmptyConjunction,
}

impl From<ExprError> for FlowgateError {
    fn from(e: ExprError) -> Self {
        FlowgateError::contract(e.to_string())
    }
}

/// Access a runtime property such as `github.event_name`.
///
/// # Panics
///
/// Panics if `path` is empty. An empty left-hand side would produce a gate
/// that can never fail, so it is treated as a defect in the caller.
pub fn property(path: impl Into<String>) -> ConditionNode {
    let path = path.into();
    assert!(
        !path.trim().is_empty(),
        "condition property path must not be empty"
    );
    ConditionNode(Node::PropertyAccess(path))
}

/// A quoted string literal
pub fn string_literal(value: impl Into<String>) -> ConditionNode {
    ConditionNode(Node::StringLiteral(value.into()))
}

/// `true` or `false`
pub fn boolean(value: bool) -> ConditionNode {
    ConditionNode(Node::BooleanLiteral(value))
}

/// `left == right`
pub fn comparison(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    ConditionNode(Node::Comparison {
        left: Box::new(left),
        op: ComparisonOp::Eq,
        right: Box::new(right),
    })
}

/// Shorthand for `property(path) == 'literal'`
pub fn equals(path: impl Into<String>, literal: impl Into<String>) -> ConditionNode {
    comparison(property(path), string_literal(literal))
}

/// Shorthand for `!(property(path) == 'literal')`
pub fn not_equals(path: impl Into<String>, literal: impl Into<String>) -> ConditionNode {
    not(equals(path, literal))
}

/// `left && right`
pub fn and(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    ConditionNode(Node::And(Box::new(left), Box::new(right)))
}

/// `left || right`
pub fn or(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    ConditionNode(Node::Or(Box::new(left), Box::new(right)))
}

/// `!inner`
pub fn not(inner: ConditionNode) -> ConditionNode {
    ConditionNode(Node::Not(Box::new(inner)))
}

/// A function call such as `contains(a, b)` or `always()`
pub fn function_call(name: impl Into<String>, args: Vec<ConditionNode>) -> ConditionNode {
    ConditionNode(Node::FunctionCall {
        name: name.into(),
        args,
    })
}

/// Remove every `${{ ... }}` marker, keeping the trimmed inner text
///
/// An unterminated `${{` is left as is.
pub fn strip_markers(raw: &str) -> String {
    let mut out = String::new();
    let mut rest = raw.trim();
    while let Some(start) = rest.find("${{") {
        let after = &rest[start + 3..];
        let Some(end) = after.find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(after[..end].trim());
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// A user-supplied expression, rendered verbatim.
///
/// Every `${{ }}` marker is stripped so the expression can be combined with
/// generated conditions.
///
/// # Panics
///
/// Panics if nothing is left once the markers are removed.
pub fn expression(raw: impl AsRef<str>) -> ConditionNode {
    let raw = strip_markers(raw.as_ref());
    assert!(!raw.is_empty(), "condition expression must not be empty");
    ConditionNode(Node::Expression(raw))
}

/// Fold conditions left to right with AND.
///
/// A single condition is returned unchanged, so it renders without any
/// `&&`. Zero conditions is an error: the caller must only build a combined
/// gate when at least one check is enabled.
pub fn conjunction(conditions: Vec<ConditionNode>) -> Result<ConditionNode, ExprError> {
    let mut iter = conditions.into_iter();
    let first = iter.next().ok_or(ExprError::EmptyConjunction)?;
    Ok(iter.fold(first, and))
}

/// Fold conditions left to right with OR
pub fn disjunction(conditions: Vec<ConditionNode>) -> Result<ConditionNode, ExprError> {
    let mut iter = conditions.into_iter();
    let first = iter.next().ok_or(ExprError::EmptyConjunction)?;
    Ok(iter.fold(first, or))
}

/// `always()`
pub fn always() -> ConditionNode {
    function_call("always", vec![])
}

/// `!cancelled()`
pub fn not_cancelled() -> ConditionNode {
    not(function_call("cancelled", vec![]))
}

/// `contains(haystack, 'needle')`
pub fn contains(haystack: impl Into<String>, needle: impl Into<String>) -> ConditionNode {
    function_call("contains", vec![property(haystack), string_literal(needle)])
}
