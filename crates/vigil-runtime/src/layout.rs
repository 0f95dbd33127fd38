#![forbid(unsafe_code)]

//! Page layouts: named view trees.
//!
//! A layout is declared as a JSON-shaped tree with a single root. Each key
//! names a view; its value is `true` (or `{}`) for a leaf, or an object of
//! child views:
//!
//! ```json
//! { "app": { "universe": true, "weather": { "climate": true } } }
//! ```
//!
//! Children are ordered by view name.

use std::cell::RefCell;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vigil_model::object;

use crate::error::{Result, RuntimeError};

/// One view slot in a layout tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub view: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    #[must_use]
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            children: Vec::new(),
        }
    }

    /// Append a child slot.
    #[must_use]
    pub fn child(mut self, node: LayoutNode) -> Self {
        self.children.push(node);
        self
    }

    /// Parse a single-root tree declaration.
    pub fn from_tree(layout: &str, tree: &Value) -> Result<Self> {
        let malformed = |reason: String| RuntimeError::MalformedLayout {
            name: layout.to_owned(),
            reason,
        };
        let Some(map) = tree.as_object() else {
            return Err(malformed("expected an object with one root view".into()));
        };
        let mut roots = map.iter();
        match (roots.next(), roots.next()) {
            (Some((view, body)), None) => parse_node(layout, view, body),
            (None, _) => Err(malformed("no root view".into())),
            (Some(_), Some(_)) => Err(malformed(format!(
                "expected one root view, found {}",
                object::keys(tree).join(", ")
            ))),
        }
    }

    /// Number of slots in the tree, root included.
    #[must_use]
    pub fn view_count(&self) -> usize {
        1 + self.children.iter().map(LayoutNode::view_count).sum::<usize>()
    }

    /// View names, pre-order.
    #[must_use]
    pub fn views(&self) -> Vec<&str> {
        let mut out = vec![self.view.as_str()];
        for child in &self.children {
            out.extend(child.views());
        }
        out
    }
}

fn parse_node(layout: &str, view: &str, body: &Value) -> Result<LayoutNode> {
    match body {
        Value::Bool(true) => Ok(LayoutNode::new(view)),
        Value::Object(_) if object::is_empty(body) => Ok(LayoutNode::new(view)),
        Value::Object(map) => {
            let mut children = map
                .iter()
                .map(|(name, child)| parse_node(layout, name, child))
                .collect::<Result<Vec<_>>>()?;
            children.sort_by(|a, b| a.view.cmp(&b.view));
            Ok(LayoutNode {
                view: view.to_owned(),
                children,
            })
        }
        other => Err(RuntimeError::MalformedLayout {
            name: layout.to_owned(),
            reason: format!("view {view}: expected `true` or an object, found {other}"),
        }),
    }
}

/// Explicit registry of page layouts.
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    layouts: RefCell<AHashMap<String, LayoutNode>>,
}

impl LayoutRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a layout tree under `name`.
    pub fn define(&self, name: &str, tree: &Value) -> Result<()> {
        let node = LayoutNode::from_tree(name, tree)?;
        self.define_node(name, node)
    }

    pub fn define_node(&self, name: &str, node: LayoutNode) -> Result<()> {
        let mut layouts = self.layouts.borrow_mut();
        if layouts.contains_key(name) {
            return Err(RuntimeError::DuplicateLayout {
                name: name.to_owned(),
            });
        }
        tracing::debug!(message = "layout.define", layout = name, views = node.view_count());
        layouts.insert(name.to_owned(), node);
        Ok(())
    }

    /// The tree registered for page `name`.
    pub fn page(&self, name: &str) -> Result<LayoutNode> {
        self.layouts
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownLayout {
                name: name.to_owned(),
            })
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.layouts.borrow().contains_key(name)
    }

    pub fn clear(&self) {
        self.layouts.borrow_mut().clear();
    }
}
