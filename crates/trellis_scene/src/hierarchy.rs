//! Transform Hierarchy
//!
//! An immutable tree of [`TransformNode`]s built from a flat list of
//! descriptors with parent links.
//!
//! # Validation
//!
//! [`TransformHierarchy::build`] rejects:
//! - an empty list
//! - duplicate or non-dense indices
//! - parent links to nodes that do not exist
//! - more than one root
//! - cycles (including a node that is its own parent)
//!
//! # Traversal
//!
//! The hierarchy precomputes a breadth-first order starting at the root, so
//! every parent appears before all of its children. World matrices are
//! computed by walking this order once.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use trellis_core::{HierarchyDefect, Result, TrellisError};

use crate::node::{NodeDescriptor, TransformNode};

#[derive(Debug, Clone)]
pub struct TransformHierarchy {
    nodes: Vec<TransformNode>,
    root: usize,
    /// Node indices, parents before children.
    traversal: Vec<usize>,
    /// First node carrying each name.
    names: FxHashMap<String, usize>,
}

impl TransformHierarchy {
    /// Validates the descriptors and builds the tree.
    ///
    /// Descriptors may come in any order; they are placed by their `index`.
    /// Children are recorded in ascending index order.
    pub fn build(descriptors: Vec<NodeDescriptor>) -> Result<Self> {
        let len = descriptors.len();
        if len == 0 {
            return Err(HierarchyDefect::Empty.into());
        }

        // 1. Place descriptors by index
        let mut slots: Vec<Option<NodeDescriptor>> = (0..len).map(|_| None).collect();
        let mut stray = None;
        for descriptor in descriptors {
            let index = descriptor.index;
            if index >= len {
                stray.get_or_insert(index);
                continue;
            }
            if slots[index].is_some() {
                return Err(HierarchyDefect::DuplicateIndex(index).into());
            }
            slots[index] = Some(descriptor);
        }
        if let Some(found) = stray {
            let expected = slots.iter().position(Option::is_none).unwrap_or(len);
            return Err(HierarchyDefect::NonDenseIndex { expected, found }.into());
        }

        let mut nodes: Vec<TransformNode> = slots
            .into_iter()
            .flatten()
            .map(TransformNode::from_descriptor)
            .collect();

        // 2. Resolve parent links and find the root
        let mut root = None;
        for index in 0..len {
            match nodes[index].parent() {
                Some(parent) if parent >= len => {
                    return Err(HierarchyDefect::MissingParent {
                        node: index,
                        parent,
                    }
                    .into());
                }
                Some(parent) => nodes[parent].push_child(index),
                None => match root {
                    None => root = Some(index),
                    Some(first) => {
                        return Err(HierarchyDefect::MultipleRoots {
                            first,
                            second: index,
                        }
                        .into());
                    }
                },
            }
        }

        // Every node has a parent: the links must loop somewhere.
        let Some(root) = root else {
            return Err(HierarchyDefect::Cycle { node: 0 }.into());
        };

        // 3. Breadth-first walk from the root
        let mut traversal = Vec::with_capacity(len);
        let mut visited = vec![false; len];
        let mut queue = VecDeque::from([(root, 0u32)]);
        while let Some((index, depth)) = queue.pop_front() {
            visited[index] = true;
            traversal.push(index);
            nodes[index].set_depth(depth);
            for &child in nodes[index].children() {
                queue.push_back((child, depth + 1));
            }
        }

        // With a single root and one parent per node, anything unreached hangs
        // off a cycle.
        if let Some(node) = visited.iter().position(|seen| !seen) {
            return Err(HierarchyDefect::Cycle { node }.into());
        }

        let mut names = FxHashMap::default();
        for node in &nodes {
            names.entry(node.name().to_string()).or_insert(node.index());
        }

        Ok(Self {
            nodes,
            root,
            traversal,
            names,
        })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a built hierarchy; present for API symmetry.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn root_index(&self) -> usize {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &TransformNode {
        &self.nodes[self.root]
    }

    #[inline]
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&TransformNode> {
        self.nodes.get(index)
    }

    /// Like [`node`](Self::node), failing with
    /// [`TrellisError::InvalidNodeIndex`].
    pub fn get(&self, index: usize) -> Result<&TransformNode> {
        self.nodes.get(index).ok_or(TrellisError::InvalidNodeIndex {
            index,
            len: self.nodes.len(),
        })
    }

    /// Looks a node up by name. With duplicate names, the lowest index wins.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&TransformNode> {
        self.names.get(name).map(|&index| &self.nodes[index])
    }

    /// All nodes, indexed by node index.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[TransformNode] {
        &self.nodes
    }

    /// Node indices in breadth-first order: parents before children.
    #[inline]
    #[must_use]
    pub fn traversal_order(&self) -> &[usize] {
        &self.traversal
    }
}
