//! # Butterfly-csv Library
//!
//! Converts OpenStreetMap XML extracts into semicolon separated tables.
//!
//! ## Features
//!
//! - **Single pass parsing**: ways resolve their nodes as they are read,
//!   relations accept forward and missing members
//! - **Dynamic schema**: one column per tag key found anywhere in the extract
//! - **Two layouts**: split metadata/geometry tables, or one table per kind
//! - **Progress tracking**: optional stage callbacks for custom UIs
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let summary = butterfly_csv::convert("monaco.osm", "./out")?;
//!     println!("{} elements exported", summary.stats.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Working with the graph
//!
//! ```rust
//! use butterfly_csv::{export, parse_str, ElementId, Layout};
//!
//! let graph = parse_str(r#"<osm>
//!   <node id="1" lat="54.09" lon="12.24"><tag k="name" v="Foo"/></node>
//! </osm>"#).unwrap();
//!
//! let node = graph.get(&ElementId::node(1)).unwrap();
//! assert_eq!(node.tags["name"], "Foo");
//!
//! let tables = export(&graph, Layout::Split).unwrap();
//! assert_eq!(tables[1].contents, "ID;latitude;longitude\nN1;54.09;12.24\n");
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

pub use crate::core::error::{Error, Result};
pub use crate::core::export::{export, tag_keys, Layout, RenderedTable};
pub use crate::core::graph::ElementGraph;
pub use crate::core::model::{
    Element, ElementData, ElementId, ElementKind, Member, Metadata, Node, Relation, Tags, Way,
};
pub use crate::core::parser::{parse_file, parse_reader, parse_str};
pub use crate::core::stats::GraphStats;
pub use crate::core::writer::{write_tables, OverwriteBehavior};

mod core;

/// Pipeline stage reported to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertStage {
    Parsing,
    Exporting,
    Writing,
    Done,
}

/// Progress callback function type
pub type ProgressCallback = Arc<dyn Fn(ConvertStage) + Send + Sync>;

/// Options for conversion operations
#[derive(Clone, Default)]
pub struct ConvertOptions {
    /// Output table layout
    pub layout: Layout,

    /// Behavior when an output file already exists
    pub overwrite: OverwriteBehavior,

    /// Optional progress callback
    pub progress: Option<ProgressCallback>,
}

impl ConvertOptions {
    fn report(&self, stage: ConvertStage) {
        if let Some(progress) = &self.progress {
            progress(stage);
        }
    }
}

/// Outcome of a successful conversion
#[derive(Debug, Clone)]
pub struct ConvertSummary {
    pub stats: GraphStats,
    /// Written files, in table order
    pub files: Vec<PathBuf>,
}

/// Convert an OSM XML file into CSV tables inside `output_dir`
///
/// Uses the split layout and refuses to overwrite existing files.
pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output_dir: Q) -> Result<ConvertSummary> {
    convert_with_options(input, output_dir, &ConvertOptions::default())
}

/// Convert with custom options
///
/// # Examples
/// ```rust,no_run
/// use butterfly_csv::{ConvertOptions, Layout, OverwriteBehavior};
///
/// let options = ConvertOptions {
///     layout: Layout::PerKind,
///     overwrite: OverwriteBehavior::Force,
///     ..Default::default()
/// };
/// butterfly_csv::convert_with_options("monaco.osm", "./out", &options).unwrap();
/// ```
pub fn convert_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_dir: Q,
    options: &ConvertOptions,
) -> Result<ConvertSummary> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();

    options.report(ConvertStage::Parsing);
    let graph = parse_file(input)?;
    let stats = GraphStats::from_graph(&graph);
    info!(
        "Parsed {} nodes, {} ways, {} relations from {}",
        stats.nodes,
        stats.ways,
        stats.relations,
        input.display()
    );

    options.report(ConvertStage::Exporting);
    let tables = export(&graph, options.layout)?;

    options.report(ConvertStage::Writing);
    let files = write_tables(output_dir, &tables, options.overwrite)?;

    options.report(ConvertStage::Done);
    Ok(ConvertSummary { stats, files })
}
