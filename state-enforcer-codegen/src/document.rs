//! Decoded model document.
//!
//! Unlike [`serde_yaml::Value`], a [`Node`] mapping keeps every entry in
//! document order, repeated keys included, so the loader can tell a repeated
//! transition apart from a YAML syntax error.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_yaml::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    /// String, number, boolean or tagged value.
    Scalar(Value),
    Sequence(Vec<Node>),
    /// Entries in document order.
    Mapping(Vec<(Value, Node)>),
}

impl Node {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Scalar(Value::Bool(_)) => "a boolean",
            Self::Scalar(Value::Number(_)) => "a number",
            Self::Scalar(Value::String(_)) => "a string",
            Self::Scalar(_) => "a tagged value",
            Self::Sequence(_) => "a list",
            Self::Mapping(_) => "a mapping",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<&Value> for Node {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Sequence(items) => Self::Sequence(items.iter().map(Self::from).collect()),
            Value::Mapping(entries) => Self::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from(value)))
                    .collect(),
            ),
            scalar => Self::Scalar(scalar.clone()),
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a YAML value")
    }

    fn visit_unit<E>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        Node::deserialize(deserializer)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Bool(v)))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Number(v.into())))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Number(v.into())))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Number(v.into())))
    }

    fn visit_str<E>(self, v: &str) -> Result<Node, E> {
        Ok(Node::Scalar(Value::String(v.to_owned())))
    }

    fn visit_string<E>(self, v: String) -> Result<Node, E> {
        Ok(Node::Scalar(Value::String(v)))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<Node>()? {
            items.push(item);
        }
        Ok(Node::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Node, A::Error> {
        let mut entries = Vec::new();
        while let Some((key, value)) = map.next_entry::<Value, Node>()? {
            entries.push((key, value));
        }
        Ok(Node::Mapping(entries))
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_survive_decoding() {
        let node: Node = serde_yaml::from_str("a: 1\nb: x\na: 2\n").unwrap();
        let Node::Mapping(entries) = node else {
            panic!("expected a mapping");
        };
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str().unwrap()).collect();
        assert_eq!(keys, ["a", "b", "a"]);
        assert_eq!(entries[1].1.as_str(), Some("x"));
    }

    #[test]
    fn empty_text_is_null() {
        assert_eq!(serde_yaml::from_str::<Node>("").unwrap(), Node::Null);
        assert_eq!(serde_yaml::from_str::<Node>("~").unwrap(), Node::Null);
    }

    #[test]
    fn values_convert_structurally() {
        let value: Value = serde_yaml::from_str("k: [1, s, ~]").unwrap();
        let Node::Mapping(entries) = Node::from(&value) else {
            panic!("expected a mapping");
        };
        assert_eq!(
            entries[0].1,
            Node::Sequence(vec![
                Node::Scalar(Value::Number(1.into())),
                Node::Scalar(Value::String("s".into())),
                Node::Null,
            ])
        );
    }
}
