// src/tree/shape.rs

//! Structural description a selection tree is built from

use super::NodeKind;

/// One node of a tree shape, before any state is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeNode {
    pub name: String,
    pub kind: NodeKind,
    pub children: Vec<ShapeNode>,
}

impl ShapeNode {
    pub fn leaf(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn branch(name: impl Into<String>, kind: NodeKind, children: Vec<ShapeNode>) -> Self {
        Self {
            name: name.into(),
            kind,
            children,
        }
    }

    /// Number of nodes in this subtree, itself included
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ShapeNode::count).sum::<usize>()
    }
}
