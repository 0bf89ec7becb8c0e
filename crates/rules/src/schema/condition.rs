//! Condition tree types gating whether a triggered rule emits.

use serde::{Deserialize, Serialize};

use autoevent_core::FieldValue;

/// Boolean expression evaluated against the change context.
///
/// ```yaml
/// condition:
///   type: and
///   children:
///     - type: compare
///       left: { path: value }
///       op: "=="
///       right: { const: Taglio }
///     - type: is_set
///       value: { path: after.customer }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionNode {
    Always,
    And {
        #[serde(default)]
        children: Vec<ConditionNode>,
    },
    Or {
        #[serde(default)]
        children: Vec<ConditionNode>,
    },
    Not {
        child: Box<ConditionNode>,
    },
    Compare {
        left: ValueRef,
        op: CompareOp,
        right: ValueRef,
        #[serde(default)]
        value_kind: ValueKind,
    },
    Membership {
        value: ValueRef,
        candidates: Vec<ValueRef>,
    },
    IsSet {
        value: ValueRef,
    },
    IsNotSet {
        value: ValueRef,
    },
}

impl ConditionNode {
    pub fn compare(left: ValueRef, op: CompareOp, right: ValueRef, value_kind: ValueKind) -> Self {
        ConditionNode::Compare {
            left,
            op,
            right,
            value_kind,
        }
    }

    pub fn negate(child: ConditionNode) -> Self {
        ConditionNode::Not {
            child: Box::new(child),
        }
    }
}

/// An operand: a literal or a dotted path into the change context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ValueRef {
    Path {
        path: String,
    },
    Const {
        #[serde(rename = "const")]
        value: FieldValue,
    },
}

impl ValueRef {
    pub fn path(path: impl Into<String>) -> Self {
        ValueRef::Path { path: path.into() }
    }

    pub fn constant(value: impl Into<FieldValue>) -> Self {
        ValueRef::Const {
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==", alias = "eq")]
    Eq,
    #[serde(rename = "!=", alias = "ne")]
    Ne,
    #[serde(rename = ">", alias = "gt")]
    Gt,
    #[serde(rename = ">=", alias = "gte")]
    Gte,
    #[serde(rename = "<", alias = "lt")]
    Lt,
    #[serde(rename = "<=", alias = "lte")]
    Lte,
}

/// How both operands of a comparison are normalized before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Number,
    String,
    Date,
    #[default]
    Auto,
}
