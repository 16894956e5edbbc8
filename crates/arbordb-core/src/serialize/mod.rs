//! Text serialization of the node tree.
//!
//! Format-level only: a serializer must round-trip any tree the mapper
//! produces without loss (attribute order included), and knows nothing
//! about repositories or mappings.

mod json;
mod xml;

pub use json::JsonSerializer;
pub use xml::XmlSerializer;

use crate::node::Node;
use thiserror::Error as ThisError;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("deserialize error: {0}")]
    Deserialize(String),
}

///
/// Serializer
///

pub trait Serializer: Send + Sync {
    fn serialize(&self, root: &Node) -> Result<String, SerializeError>;

    fn deserialize(&self, text: &str) -> Result<Node, SerializeError>;
}
