// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Condition expression tree and its renderer

use std::fmt;

/// Comparison operators. Only equality exists; inequality is expressed by
/// negating an equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "=="),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Node {
    PropertyAccess(String),
    StringLiteral(String),
    BooleanLiteral(bool),
    Comparison {
        left: Box<ConditionNode>,
        op: ComparisonOp,
        right: Box<ConditionNode>,
    },
    And(Box<ConditionNode>, Box<ConditionNode>),
    Or(Box<ConditionNode>, Box<ConditionNode>),
    Not(Box<ConditionNode>),
    FunctionCall {
        name: String,
        args: Vec<ConditionNode>,
    },
    Expression(String),
}

/// An immutable node of a condition expression.
///
/// Nodes can only be created through the builder functions in
/// [`crate::expr`], which reject malformed input such as an empty property
/// path. Equal trees always render to the same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionNode(pub(crate) Node);

impl ConditionNode {
    /// Render the expression without the `${{ }}` wrapper
    pub fn render(&self) -> String {
        match &self.0 {
            Node::PropertyAccess(path) => path.clone(),
            Node::StringLiteral(value) => format!("'{}'", value.replace('\'', "''")),
            Node::BooleanLiteral(value) => value.to_string(),
            Node::Comparison { left, op, right } => {
                format!("{} {} {}", left.render_operand(), op, right.render_operand())
            }
            Node::And(..) => self.render_chain(" && "),
            Node::Or(..) => self.render_chain(" || "),
            Node::Not(inner) => {
                if inner.is_atom() {
                    format!("!{}", inner.render())
                } else {
                    format!("!({})", inner.render())
                }
            }
            Node::FunctionCall { name, args } => {
                let args: Vec<String> = args.iter().map(|a| a.render()).collect();
                format!("{}({})", name, args.join(", "))
            }
            Node::Expression(raw) => raw.clone(),
        }
    }

    /// Render wrapped as `${{ ... }}`, the form used for job outputs
    pub fn wrap(&self) -> String {
        format!("${{{{ {} }}}}", self.render())
    }

    /// Operands of an AND chain, flattened left to right.
    ///
    /// A node that is not an AND is its own single operand.
    pub fn and_operands(&self) -> Vec<&ConditionNode> {
        let mut out = Vec::new();
        self.collect_chain(&mut out, true);
        out
    }

    /// Whether this node is a single comparison
    pub fn is_comparison(&self) -> bool {
        matches!(self.0, Node::Comparison { .. })
    }

    fn render_chain(&self, joiner: &str) -> String {
        let is_and = matches!(self.0, Node::And(..));
        let mut operands = Vec::new();
        self.collect_chain(&mut operands, is_and);

        operands
            .iter()
            .map(|op| format!("({})", op.render()))
            .collect::<Vec<_>>()
            .join(joiner)
    }

    fn collect_chain<'a>(&'a self, out: &mut Vec<&'a ConditionNode>, and: bool) {
        match (&self.0, and) {
            (Node::And(l, r), true) | (Node::Or(l, r), false) => {
                l.collect_chain(out, and);
                r.collect_chain(out, and);
            }
            _ => out.push(self),
        }
    }

    fn render_operand(&self) -> String {
        if self.is_atom() {
            self.render()
        } else {
            format!("({})", self.render())
        }
    }

    fn is_atom(&self) -> bool {
        matches!(
            self.0,
            Node::PropertyAccess(_)
                | Node::StringLiteral(_)
                | Node::BooleanLiteral(_)
                | Node::FunctionCall { .. }
        )
    }
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
