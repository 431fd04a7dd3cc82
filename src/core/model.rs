//! OSM element model
//!
//! Nodes, ways and relations share an identifier, editorial metadata and a
//! tag map. Ways and relations reference other elements by [`ElementId`] only;
//! the [`ElementGraph`](crate::core::graph::ElementGraph) owns every record.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::core::error::{Error, Result};

/// The three OSM element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    /// One-letter prefix used in composite identifiers
    pub fn prefix(self) -> char {
        match self {
            ElementKind::Node => 'N',
            ElementKind::Way => 'W',
            ElementKind::Relation => 'R',
        }
    }

    /// Kind from its OSM XML name (`node`, `way`, `relation`)
    pub fn from_osm_name(name: &str) -> Option<Self> {
        match name {
            "node" => Some(ElementKind::Node),
            "way" => Some(ElementKind::Way),
            "relation" => Some(ElementKind::Relation),
            _ => None,
        }
    }

    pub fn osm_name(self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

/// Identifier unique across all element kinds, displayed as `N123`, `W45`, `R6`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    pub kind: ElementKind,
    pub number: i64,
}

impl ElementId {
    pub fn new(kind: ElementKind, number: i64) -> Self {
        Self { kind, number }
    }

    pub fn node(number: i64) -> Self {
        Self::new(ElementKind::Node, number)
    }

    pub fn way(number: i64) -> Self {
        Self::new(ElementKind::Way, number)
    }

    pub fn relation(number: i64) -> Self {
        Self::new(ElementKind::Relation, number)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.number)
    }
}

impl FromStr for ElementId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let kind = match chars.next() {
            Some('N') => ElementKind::Node,
            Some('W') => ElementKind::Way,
            Some('R') => ElementKind::Relation,
            _ => {
                return Err(Error::InvalidElement(format!(
                    "'{s}' does not start with N, W or R"
                )))
            }
        };
        let number = chars
            .as_str()
            .parse::<i64>()
            .map_err(|_| Error::InvalidElement(format!("'{s}' has no numeric identifier")))?;
        Ok(Self::new(kind, number))
    }
}

/// Editorial metadata carried by every element
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Last editor name
    pub user: Option<String>,
    /// Last editor id
    pub uid: i64,
    /// Last edit time, kept as the raw attribute text
    pub timestamp: Option<String>,
    pub visible: bool,
    pub version: u32,
    /// Last changeset id
    pub changeset: i64,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            user: None,
            uid: 0,
            timestamp: None,
            visible: true,
            version: 1,
            changeset: 0,
        }
    }
}

/// Tag map, iterated in insertion order
pub type Tags = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

/// Ordered node list; node entries are graph identifiers, not copies
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Way {
    pub id: i64,
    nodes: Vec<ElementId>,
}

impl Way {
    /// Empty way, to be filled with [`Way::push_node`]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            nodes: Vec::new(),
        }
    }

    /// Way with its complete node list; at least two nodes are required
    pub fn with_nodes(id: i64, nodes: Vec<ElementId>) -> Result<Self> {
        if nodes.len() < 2 {
            return Err(Error::InvalidElement(format!(
                "way W{id} needs at least two nodes, got {}",
                nodes.len()
            )));
        }
        Ok(Self { id, nodes })
    }

    pub fn nodes(&self) -> &[ElementId] {
        &self.nodes
    }

    pub fn push_node(&mut self, node: ElementId) {
        self.nodes.push(node);
    }

    /// Remove the node at `index`, refusing to go below two nodes
    pub fn remove_node(&mut self, index: usize) -> Result<ElementId> {
        if self.nodes.len() == 2 {
            return Err(Error::InvalidElement(format!(
                "can't remove node from W{}, only two remaining",
                self.id
            )));
        }
        if index >= self.nodes.len() {
            return Err(Error::InvalidElement(format!(
                "W{} has no node at index {index}",
                self.id
            )));
        }
        Ok(self.nodes.remove(index))
    }
}

/// A relation member: the referenced element and its (possibly empty) role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: ElementId,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relation {
    pub id: i64,
    members: Vec<Member>,
}

impl Relation {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            members: Vec::new(),
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn add_member(&mut self, id: ElementId, role: impl Into<String>) {
        self.members.push(Member {
            id,
            role: role.into(),
        });
    }

    /// Remove the first member referencing `id`
    pub fn remove_member(&mut self, id: ElementId) -> Option<Member> {
        let index = self.members.iter().position(|m| m.id == id)?;
        Some(self.members.remove(index))
    }

    /// Role of the first member referencing `id`
    pub fn role_of(&self, id: ElementId) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.role.as_str())
    }
}

/// Kind-specific payload of an element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementData {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

/// A complete OSM element
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub data: ElementData,
    pub meta: Metadata,
    pub tags: Tags,
}

impl Element {
    fn from_data(data: ElementData) -> Self {
        Self {
            data,
            meta: Metadata::default(),
            tags: Tags::new(),
        }
    }

    pub fn node(id: i64, lat: f64, lon: f64) -> Self {
        Self::from_data(ElementData::Node(Node { id, lat, lon }))
    }

    pub fn way(way: Way) -> Self {
        Self::from_data(ElementData::Way(way))
    }

    pub fn relation(relation: Relation) -> Self {
        Self::from_data(ElementData::Relation(relation))
    }

    /// Zero-valued stand-in for a relation member missing from the extract
    pub fn placeholder(id: ElementId) -> Self {
        match id.kind {
            ElementKind::Node => Self::node(id.number, 0.0, 0.0),
            ElementKind::Way => Self::way(Way::new(id.number)),
            ElementKind::Relation => Self::relation(Relation::new(id.number)),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match &self.data {
            ElementData::Node(_) => ElementKind::Node,
            ElementData::Way(_) => ElementKind::Way,
            ElementData::Relation(_) => ElementKind::Relation,
        }
    }

    pub fn id(&self) -> ElementId {
        let number = match &self.data {
            ElementData::Node(n) => n.id,
            ElementData::Way(w) => w.id,
            ElementData::Relation(r) => r.id,
        };
        ElementId::new(self.kind(), number)
    }

    /// Add or replace a tag
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn remove_tag(&mut self, key: &str) -> Option<String> {
        self.tags.shift_remove(key)
    }

    pub fn as_node(&self) -> Option<&Node> {
        match &self.data {
            ElementData::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_way(&self) -> Option<&Way> {
        match &self.data {
            ElementData::Way(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match &self.data {
            ElementData::Relation(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element {} ({} tags)", self.id(), self.tags.len())
    }
}
