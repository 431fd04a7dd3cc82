//! Element graph
//!
//! The graph is the arena: it owns every element, and ways and relations
//! point into it by [`ElementId`]. Iteration follows insertion order.

use std::borrow::Cow;
use std::collections::HashSet;

use indexmap::IndexMap;

use crate::core::model::{Element, ElementData, ElementId, Member, Node, Relation, Way};

#[derive(Debug, Clone, Default)]
pub struct ElementGraph {
    elements: IndexMap<ElementId, Element>,
}

impl ElementGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an element under its own identifier.
    ///
    /// An element with the same identifier is replaced in place and returned.
    pub fn insert(&mut self, element: Element) -> Option<Element> {
        self.elements.insert(element.id(), element)
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&Element, &Node)> {
        self.iter().filter_map(|e| e.as_node().map(|n| (e, n)))
    }

    pub fn ways(&self) -> impl Iterator<Item = (&Element, &Way)> {
        self.iter().filter_map(|e| e.as_way().map(|w| (e, w)))
    }

    pub fn relations(&self) -> impl Iterator<Item = (&Element, &Relation)> {
        self.iter().filter_map(|e| e.as_relation().map(|r| (e, r)))
    }

    /// The member's element, or a placeholder of its kind when the extract
    /// never defined it. Placeholders are not inserted.
    pub fn resolve_member(&self, member: &Member) -> Cow<'_, Element> {
        match self.elements.get(&member.id) {
            Some(element) => Cow::Borrowed(element),
            None => Cow::Owned(Element::placeholder(member.id)),
        }
    }

    /// Every identifier reachable from `root` through relation members and
    /// way nodes, depth-first in member order, each listed once.
    ///
    /// Relations may contain themselves through other relations, so visited
    /// ids are never expanded twice. Ids absent from the graph are listed
    /// but not expanded.
    pub fn member_closure(&self, root: ElementId) -> Vec<ElementId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        visited.insert(root);

        while let Some(id) = stack.pop() {
            let children: Vec<ElementId> = match self.get(&id).map(|e| &e.data) {
                Some(ElementData::Way(way)) => way.nodes().to_vec(),
                Some(ElementData::Relation(relation)) => {
                    relation.members().iter().map(|m| m.id).collect()
                }
                _ => Vec::new(),
            };

            // Reverse so the first member is popped first
            for child in children.into_iter().rev() {
                if visited.insert(child) {
                    stack.push(child);
                }
            }

            if id != root {
                order.push(id);
            }
        }

        order
    }
}

impl<'a> IntoIterator for &'a ElementGraph {
    type Item = &'a Element;
    type IntoIter = indexmap::map::Values<'a, ElementId, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.values()
    }
}
