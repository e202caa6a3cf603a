//! Question forest stored as an arena.
//!
//! Nodes own their children through `NodeId` indices into
//! [`QuestionForest::nodes`]. The `parent` field is a lookup aid only.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural kind of a question item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Unmarked text introducing the items below it.
    SectionHeader,
    Numbered,
    Lettered,
    Roman,
    Bullet,
    Indented,
    General,
    /// Row without question text that still carries answer cells.
    Continuation,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SectionHeader => "section_header",
            Self::Numbered => "numbered",
            Self::Lettered => "lettered",
            Self::Roman => "roman",
            Self::Bullet => "bullet",
            Self::Indented => "indented",
            Self::General => "general",
            Self::Continuation => "continuation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionNode {
    pub id: NodeId,
    pub sheet: String,
    /// Physical rows this node was read from.
    pub rows: Vec<usize>,
    pub text: String,
    pub level: usize,
    pub kind: QuestionKind,
    /// Marker text that introduced the item (`a)`, `1.2.`, `•`), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    pub children: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    pub answer_columns: Vec<usize>,
    /// Answers already present in the source row, keyed by column.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub existing_answers: BTreeMap<usize, String>,
}

impl QuestionNode {
    pub fn is_fillable(&self) -> bool {
        self.children.is_empty() && !self.answer_columns.is_empty()
    }

    pub fn primary_row(&self) -> Option<usize> {
        self.rows.first().copied()
    }
}

/// Specification of a node to insert; the forest assigns the id.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub row: usize,
    pub text: String,
    pub level: usize,
    pub kind: QuestionKind,
    pub marker: Option<String>,
    pub answer_columns: Vec<usize>,
    pub existing_answers: BTreeMap<usize, String>,
}

/// All question nodes of one sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionForest {
    pub sheet: String,
    pub nodes: Vec<QuestionNode>,
    pub roots: Vec<NodeId>,
}

impl QuestionForest {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&QuestionNode> {
        self.nodes.get(id.0)
    }

    /// Insert a node under `parent`, or as a root when `parent` is `None`.
    pub fn insert(&mut self, parent: Option<NodeId>, node: NewNode) -> Result<NodeId> {
        if let Some(parent) = parent
            && parent.0 >= self.nodes.len()
        {
            return Err(ModelError::UnknownNode(parent.0));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(QuestionNode {
            id,
            sheet: self.sheet.clone(),
            rows: vec![node.row],
            text: node.text,
            level: node.level,
            kind: node.kind,
            marker: node.marker,
            children: Vec::new(),
            parent,
            answer_columns: node.answer_columns,
            existing_answers: node.existing_answers,
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Node ids in pre-order, siblings left to right.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.get(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }

    /// Fillable nodes in deterministic tree order.
    pub fn fillable(&self) -> Vec<&QuestionNode> {
        self.preorder()
            .into_iter()
            .filter_map(|id| self.get(id))
            .filter(|node| node.is_fillable())
            .collect()
    }

    /// Nodes that originate from a physical row.
    pub fn nodes_for_row(&self, row: usize) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.rows.contains(&row))
            .map(|node| node.id)
            .collect()
    }

    /// Ancestors of a node from the nearest parent up to its root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).and_then(|node| node.parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.get(parent).and_then(|node| node.parent);
        }
        chain
    }

    pub fn stats(&self) -> HierarchyStats {
        let mut stats = HierarchyStats {
            total: self.nodes.len(),
            roots: self.roots.len(),
            ..HierarchyStats::default()
        };
        for node in &self.nodes {
            *stats.by_kind.entry(node.kind.as_str().to_string()).or_default() += 1;
            stats.max_depth = stats.max_depth.max(node.level);
            if node.is_fillable() {
                stats.fillable += 1;
            } else {
                stats.structural += 1;
            }
        }
        stats
    }
}

/// Counts describing a sheet's question forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyStats {
    pub total: usize,
    pub roots: usize,
    pub fillable: usize,
    pub structural: usize,
    pub max_depth: usize,
    pub by_kind: BTreeMap<String, usize>,
}

impl HierarchyStats {
    pub fn merge(&mut self, other: &HierarchyStats) {
        self.total += other.total;
        self.roots += other.roots;
        self.fillable += other.fillable;
        self.structural += other.structural;
        self.max_depth = self.max_depth.max(other.max_depth);
        for (kind, count) in &other.by_kind {
            *self.by_kind.entry(kind.clone()).or_default() += count;
        }
    }
}
