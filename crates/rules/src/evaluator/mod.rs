//! Condition tree evaluator.
//!
//! Evaluates a [`ConditionNode`] against the change context of one rule
//! attempt. Interior nodes combine children with AND, OR, or NOT; leaves
//! compare, test membership, or test presence of values resolved by dotted
//! path. Evaluation is total: missing data makes a leaf false, never an
//! error.

mod compare;

use autoevent_core::FieldValue;

use crate::schema::{ConditionNode, ValueRef};
use crate::temporal::Temporal;

use compare::{compare, normalize};

/// The values a condition can see, plus the calendar used to read dates.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    root: &'a FieldValue,
    temporal: Temporal,
}

impl<'a> EvalContext<'a> {
    pub fn new(root: &'a FieldValue, temporal: Temporal) -> Self {
        Self { root, temporal }
    }

    /// Resolve an operand. Paths that do not resolve yield `Null`.
    pub fn resolve<'b>(&'b self, value: &'b ValueRef) -> &'b FieldValue
    where
        'a: 'b,
    {
        match value {
            ValueRef::Path { path } => self.root.lookup(path),
            ValueRef::Const { value } => value,
        }
    }
}

// ── Evaluation ──────────────────────────────────────────────────────

/// Evaluate an optional condition. An absent condition is true.
pub fn evaluate(node: Option<&ConditionNode>, ctx: &EvalContext<'_>) -> bool {
    node.map_or(true, |node| evaluate_node(node, ctx))
}

fn evaluate_node(node: &ConditionNode, ctx: &EvalContext<'_>) -> bool {
    match node {
        ConditionNode::Always => true,
        ConditionNode::And { children } => children.iter().all(|c| evaluate_node(c, ctx)),
        ConditionNode::Or { children } => children.iter().any(|c| evaluate_node(c, ctx)),
        ConditionNode::Not { child } => !evaluate_node(child, ctx),
        ConditionNode::Compare {
            left,
            op,
            right,
            value_kind,
        } => {
            let left = normalize(ctx.resolve(left), *value_kind, &ctx.temporal);
            let right = normalize(ctx.resolve(right), *value_kind, &ctx.temporal);
            match (left, right) {
                (Some(l), Some(r)) => compare(&l, *op, &r),
                _ => false,
            }
        }
        ConditionNode::Membership { value, candidates } => {
            let needle = ctx.resolve(value);
            candidates.iter().any(|c| ctx.resolve(c) == needle)
        }
        ConditionNode::IsSet { value } => ctx.resolve(value).is_present(),
        ConditionNode::IsNotSet { value } => !ctx.resolve(value).is_present(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
