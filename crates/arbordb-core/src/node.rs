//! The tree node the mapper reads and writes.
//!
//! A [`Node`] is the serialized form of one entity instance: a named node
//! with an ordered attribute list, an ordered child list, and optional
//! direct text. Attribute and child order is significant and preserved by
//! every operation here.

/// Name of the synthetic root node a repository keeps its entities under.
pub const ROOT_NODE_NAME: &str = "root";

///
/// Attribute
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

///
/// Node
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Node {
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
    text: Option<String>,
}

impl Node {
    /// Create an empty node with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Create an empty repository root node.
    #[must_use]
    pub fn root() -> Self {
        Self::new(ROOT_NODE_NAME)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // ======================================================================
    // Attributes
    // ======================================================================

    /// Look up an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    /// Set an attribute, replacing an existing one in place so attribute
    /// order stays stable.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|attribute| attribute.name == name)
        {
            existing.value = value;
        } else {
            self.attributes.push(Attribute { name, value });
        }
    }

    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    // ======================================================================
    // Children
    // ======================================================================

    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// First child with the given name, if any.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn push_child(&mut self, child: Self) {
        self.children.push(child);
    }

    /// Keep only the children for which the predicate holds; returns how
    /// many were removed.
    pub fn retain_children(&mut self, mut keep: impl FnMut(&Self) -> bool) -> usize {
        let before = self.children.len();
        self.children.retain(|child| keep(child));

        before - self.children.len()
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    // ======================================================================
    // Text
    // ======================================================================

    /// Direct text content, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_order_is_preserved() {
        let mut node = Node::new("Person");
        node.set_attribute("id", "1");
        node.set_attribute("name", "Peter");
        node.set_attribute("id", "2");

        let names: Vec<&str> = node
            .attributes()
            .iter()
            .map(|attribute| attribute.name.as_str())
            .collect();

        assert_eq!(names, ["id", "name"]);
        assert_eq!(node.attribute("id"), Some("2"));
    }

    #[test]
    fn child_lookup_returns_first_match() {
        let mut root = Node::root();
        let mut first = Node::new("Person");
        first.set_text("a");
        let mut second = Node::new("Person");
        second.set_text("b");
        root.push_child(first);
        root.push_child(second);

        assert_eq!(root.child("Person").and_then(Node::text), Some("a"));
        assert!(root.child("Geek").is_none());
    }

    #[test]
    fn retain_children_reports_removed_count() {
        let mut root = Node::root();
        root.push_child(Node::new("a"));
        root.push_child(Node::new("b"));
        root.push_child(Node::new("a"));

        let removed = root.retain_children(|child| child.name() != "a");

        assert_eq!(removed, 2);
        assert_eq!(root.children().len(), 1);
    }
}
