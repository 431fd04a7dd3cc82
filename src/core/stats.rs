//! Element statistics

use std::fmt;

use serde::Serialize;

use crate::core::export::tag_keys;
use crate::core::graph::ElementGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub ways: usize,
    pub relations: usize,
    /// Distinct tag keys, i.e. the number of tag columns in `elements.csv`
    pub tag_keys: usize,
    /// Relation members that are not defined in the extract
    pub missing_members: usize,
}

impl GraphStats {
    pub fn from_graph(graph: &ElementGraph) -> Self {
        let missing_members = graph
            .relations()
            .flat_map(|(_, relation)| relation.members())
            .filter(|member| !graph.contains(&member.id))
            .count();

        Self {
            nodes: graph.nodes().count(),
            ways: graph.ways().count(),
            relations: graph.relations().count(),
            tag_keys: tag_keys(graph).len(),
            missing_members,
        }
    }

    pub fn total(&self) -> usize {
        self.nodes + self.ways + self.relations
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "= Elements statistics =")?;
        writeln!(f, "* Nodes:\t\t{}", self.nodes)?;
        writeln!(f, "* Ways:\t\t\t{}", self.ways)?;
        writeln!(f, "* Relations:\t\t{}", self.relations)?;
        writeln!(f, "* Tag keys:\t\t{}", self.tag_keys)?;
        write!(f, "* Missing members:\t{}", self.missing_members)
    }
}
