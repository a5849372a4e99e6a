//! The predicate tree evaluated by the storage engine.
//!
//! A [`Predicate`] is a strict binary tree. Logical and comparison nodes always have exactly two
//! children; literals and references are leaves. The serde form is the shape of the storage
//! RPC message:
//!
//! ```json
//! {"root": {"nodeType": "comparisonExpression", "comparison": "equal",
//!           "children": [{"nodeType": "tagRef", "tagRefValue": "host"},
//!                        {"nodeType": "literal", "stringValue": "server01"}]}}
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::Display;
use thiserror::Error;

/// Tag key under which the storage engine indexes a series' measurement name.
pub const MEASUREMENT_TAG_KEY: &[u8] = b"\x00";
/// Tag key under which the storage engine indexes a series' field key.
pub const FIELD_TAG_KEY: &[u8] = b"\xff";

/// Key of a tag reference. The reserved keys are not valid UTF-8, so keys are kept as bytes.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TagKey(Vec<u8>);

impl TagKey {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into())
    }

    pub fn measurement() -> Self {
        Self(MEASUREMENT_TAG_KEY.to_vec())
    }

    pub fn field() -> Self {
        Self(FIELD_TAG_KEY.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for TagKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for TagKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            MEASUREMENT_TAG_KEY => write!(f, "_measurement"),
            FIELD_TAG_KEY => write!(f, "_field"),
            key => write!(f, "{}", String::from_utf8_lossy(key)),
        }
    }
}

impl Serialize for TagKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(&self.0) {
            Ok(key) => serializer.serialize_str(key),
            Err(_) => serializer.serialize_bytes(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for TagKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Bytes(Vec<u8>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(key) => TagKey(key.into_bytes()),
            Repr::Bytes(key) => TagKey(key),
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
pub enum Logical {
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
pub enum Comparison {
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "startsWith")]
    StartsWith,
    #[strum(serialize = "=~")]
    Regex,
    #[strum(serialize = "!~")]
    NotRegex,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Regex(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireNode", try_from = "WireNode")]
pub enum Node {
    Logical {
        op: Logical,
        left: Box<Node>,
        right: Box<Node>,
    },
    Comparison {
        op: Comparison,
        left: Box<Node>,
        right: Box<Node>,
    },
    Literal(Literal),
    TagRef(TagKey),
    FieldRef(String),
}

impl Node {
    pub fn logical(op: Logical, left: Node, right: Node) -> Self {
        Node::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn comparison(op: Comparison, left: Node, right: Node) -> Self {
        Node::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn tag(key: impl Into<TagKey>) -> Self {
        Node::TagRef(key.into())
    }

    pub fn field(key: impl Into<String>) -> Self {
        Node::FieldRef(key.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Node::Literal(Literal::String(value.into()))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Logical { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Node::Comparison { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Node::Literal(Literal::String(s)) => write!(f, "{:?}", s),
            Node::Literal(Literal::Integer(i)) => write!(f, "{}", i),
            Node::Literal(Literal::Float(v)) => write!(f, "{:?}", v),
            Node::Literal(Literal::Boolean(b)) => write!(f, "{}", b),
            Node::Literal(Literal::Regex(re)) => write!(f, "/{}/", re),
            Node::TagRef(key) => write!(f, "{}", key),
            Node::FieldRef(key) => write!(f, "${}", key),
        }
    }
}

/// A storage predicate, the unit attached to a read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub root: Node,
}

impl Predicate {
    pub fn new(root: Node) -> Self {
        Self { root }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    LogicalExpression,
    ComparisonExpression,
    Literal,
    TagRef,
    FieldRef,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireValue {
    Logical(Logical),
    Comparison(Comparison),
    StringValue(String),
    IntegerValue(i64),
    FloatValue(f64),
    BooleanValue(bool),
    RegexValue(String),
    TagRefValue(TagKey),
    FieldRefValue(String),
}

/// The storage RPC representation of a [`Node`]: a node type, one value, and a child list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNode {
    pub node_type: NodeType,
    #[serde(flatten)]
    pub value: WireValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WireNode>,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("{node_type} node must have 2 children, found {found}")]
    Arity { node_type: NodeType, found: usize },
    #[error("{node_type} node cannot carry value {value:?}")]
    Mismatch { node_type: NodeType, value: WireValue },
}

impl From<Node> for WireNode {
    fn from(node: Node) -> Self {
        let leaf = |node_type, value| WireNode {
            node_type,
            value,
            children: vec![],
        };
        match node {
            Node::Logical { op, left, right } => WireNode {
                node_type: NodeType::LogicalExpression,
                value: WireValue::Logical(op),
                children: vec![(*left).into(), (*right).into()],
            },
            Node::Comparison { op, left, right } => WireNode {
                node_type: NodeType::ComparisonExpression,
                value: WireValue::Comparison(op),
                children: vec![(*left).into(), (*right).into()],
            },
            Node::Literal(literal) => {
                let value = match literal {
                    Literal::String(v) => WireValue::StringValue(v),
                    Literal::Integer(v) => WireValue::IntegerValue(v),
                    Literal::Float(v) => WireValue::FloatValue(v),
                    Literal::Boolean(v) => WireValue::BooleanValue(v),
                    Literal::Regex(v) => WireValue::RegexValue(v),
                };
                leaf(NodeType::Literal, value)
            }
            Node::TagRef(key) => leaf(NodeType::TagRef, WireValue::TagRefValue(key)),
            Node::FieldRef(key) => leaf(NodeType::FieldRef, WireValue::FieldRefValue(key)),
        }
    }
}

impl TryFrom<WireNode> for Node {
    type Error = WireError;

    fn try_from(wire: WireNode) -> Result<Self, Self::Error> {
        let WireNode {
            node_type,
            value,
            children,
        } = wire;

        let binary = |children: Vec<WireNode>| -> Result<(Box<Node>, Box<Node>), WireError> {
            let found = children.len();
            let [left, right]: [WireNode; 2] = children
                .try_into()
                .map_err(|_| WireError::Arity { node_type, found })?;
            Ok((Box::new(left.try_into()?), Box::new(right.try_into()?)))
        };

        match (node_type, value) {
            (NodeType::LogicalExpression, WireValue::Logical(op)) => {
                let (left, right) = binary(children)?;
                Ok(Node::Logical { op, left, right })
            }
            (NodeType::ComparisonExpression, WireValue::Comparison(op)) => {
                let (left, right) = binary(children)?;
                Ok(Node::Comparison { op, left, right })
            }
            (NodeType::Literal, WireValue::StringValue(v)) => Ok(Node::Literal(Literal::String(v))),
            (NodeType::Literal, WireValue::IntegerValue(v)) => {
                Ok(Node::Literal(Literal::Integer(v)))
            }
            (NodeType::Literal, WireValue::FloatValue(v)) => Ok(Node::Literal(Literal::Float(v))),
            (NodeType::Literal, WireValue::BooleanValue(v)) => {
                Ok(Node::Literal(Literal::Boolean(v)))
            }
            (NodeType::Literal, WireValue::RegexValue(v)) => Ok(Node::Literal(Literal::Regex(v))),
            (NodeType::TagRef, WireValue::TagRefValue(key)) => Ok(Node::TagRef(key)),
            (NodeType::FieldRef, WireValue::FieldRefValue(key)) => Ok(Node::FieldRef(key)),
            (node_type, value) => Err(WireError::Mismatch { node_type, value }),
        }
    }
}
