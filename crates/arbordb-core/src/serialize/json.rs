//! JSON codec for the node tree.
//!
//! An explicit structural encoding rather than an XML-to-JSON convention:
//! attributes stay an ordered array so their order survives the JSON
//! object model.

use crate::{
    node::Node,
    serialize::{SerializeError, Serializer},
};
use serde_json::{Map, Value, json};

/// Maximum node nesting accepted on read.
const MAX_JSON_DEPTH: usize = 128;

///
/// JsonSerializer
///

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, root: &Node) -> Result<String, SerializeError> {
        serde_json::to_string_pretty(&node_to_value(root))
            .map_err(|err| SerializeError::Serialize(err.to_string()))
    }

    fn deserialize(&self, text: &str) -> Result<Node, SerializeError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| SerializeError::Deserialize(err.to_string()))?;

        node_from_value(&value, 0)
    }
}

fn node_to_value(node: &Node) -> Value {
    let mut object = Map::new();
    object.insert("name".to_string(), Value::String(node.name().to_string()));

    if !node.attributes().is_empty() {
        let attributes: Vec<Value> = node
            .attributes()
            .iter()
            .map(|attribute| json!({ "name": attribute.name, "value": attribute.value }))
            .collect();
        object.insert("attributes".to_string(), Value::Array(attributes));
    }

    if let Some(text) = node.text() {
        object.insert("text".to_string(), Value::String(text.to_string()));
    }

    if node.has_children() {
        let children: Vec<Value> = node.children().iter().map(node_to_value).collect();
        object.insert("children".to_string(), Value::Array(children));
    }

    Value::Object(object)
}

fn node_from_value(value: &Value, depth: usize) -> Result<Node, SerializeError> {
    if depth >= MAX_JSON_DEPTH {
        return Err(SerializeError::Deserialize(
            "node nesting too deep".to_string(),
        ));
    }

    let object = value
        .as_object()
        .ok_or_else(|| SerializeError::Deserialize("expected a node object".to_string()))?;

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| SerializeError::Deserialize("node is missing its name".to_string()))?;
    let mut node = Node::new(name);

    if let Some(attributes) = object.get("attributes") {
        let attributes = attributes.as_array().ok_or_else(|| {
            SerializeError::Deserialize("'attributes' must be an array".to_string())
        })?;

        for attribute in attributes {
            let name = attribute.get("name").and_then(Value::as_str);
            let value = attribute.get("value").and_then(Value::as_str);

            match (name, value) {
                (Some(name), Some(value)) => node.set_attribute(name, value),
                _ => {
                    return Err(SerializeError::Deserialize(
                        "attribute entries need 'name' and 'value' strings".to_string(),
                    ));
                }
            }
        }
    }

    if let Some(text) = object.get("text") {
        let text = text
            .as_str()
            .ok_or_else(|| SerializeError::Deserialize("'text' must be a string".to_string()))?;
        node.set_text(text);
    }

    if let Some(children) = object.get("children") {
        let children = children.as_array().ok_or_else(|| {
            SerializeError::Deserialize("'children' must be an array".to_string())
        })?;

        for child in children {
            node.push_child(node_from_value(child, depth + 1)?);
        }
    }

    Ok(node)
}

///
/// TESTS
///
