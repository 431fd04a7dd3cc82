//! CSV export of an element graph
//!
//! The exporter renders the whole graph into in-memory buffers, one per
//! destination file. Fields are separated by `;` and are never escaped; only
//! bracketed lists and tag values are wrapped in double quotes.
//!
//! Two layouts exist, picked explicitly with [`Layout`]:
//!
//! - [`Layout::Split`] (default): `elements.csv` holds the metadata plus one
//!   column per tag key found anywhere in the graph, while `nodes.csv`,
//!   `ways.csv` and `relations.csv` hold the kind-specific columns.
//! - [`Layout::PerKind`]: one self-contained file per kind, tags inlined as a
//!   single bracketed `key=value` list.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use indexmap::IndexSet;

use crate::core::error::{Error, Result};
use crate::core::graph::ElementGraph;
use crate::core::model::{Element, ElementId, Member, Tags};

/// Token written for absent values
pub const NULL: &str = "null";

const METADATA_COLUMNS: [&str; 6] = [
    "ID",
    "UserID",
    "timestamp",
    "isVisible",
    "version",
    "changesetID",
];

/// Output table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// `elements`, `nodes`, `ways` and `relations` tables
    #[default]
    Split,
    /// Self-contained `nodes`, `ways` and `relations` tables with inlined tags
    PerKind,
}

/// One rendered output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTable {
    pub file_name: &'static str,
    pub contents: String,
}

/// Every tag key used in the graph, in first-seen order
pub fn tag_keys(graph: &ElementGraph) -> IndexSet<&str> {
    graph
        .iter()
        .flat_map(|element| element.tags.keys().map(String::as_str))
        .collect()
}

/// Render the graph with the given layout
pub fn export(graph: &ElementGraph, layout: Layout) -> Result<Vec<RenderedTable>> {
    match layout {
        Layout::Split => export_split(graph),
        Layout::PerKind => export_per_kind(graph),
    }
}

fn export_split(graph: &ElementGraph) -> Result<Vec<RenderedTable>> {
    let keys = tag_keys(graph);

    let mut header = columns(&METADATA_COLUMNS);
    header.extend(keys.iter().map(|key| quoted(key)));
    let mut elements = TableWriter::new("elements.csv", &header)?;
    for element in graph {
        let mut row = metadata_fields(element).to_vec();
        row.extend(keys.iter().map(|key| match element.tags.get(*key) {
            Some(value) => quoted(value),
            None => NULL.to_string(),
        }));
        elements.row(&row)?;
    }

    let mut nodes = TableWriter::new("nodes.csv", &columns(&["ID", "latitude", "longitude"]))?;
    for (element, node) in graph.nodes() {
        nodes.row(&[
            element.id().to_string(),
            format_coordinate(node.lat),
            format_coordinate(node.lon),
        ])?;
    }

    let mut ways = TableWriter::new("ways.csv", &columns(&["ID", "nodes"]))?;
    for (element, way) in graph.ways() {
        ways.row(&[element.id().to_string(), id_list(way.nodes())])?;
    }

    let mut relations =
        TableWriter::new("relations.csv", &columns(&["ID", "members", "roles"]))?;
    for (element, relation) in graph.relations() {
        let members = relation.members();
        relations.row(&[
            element.id().to_string(),
            bracketed(members.iter().map(|m| m.id.to_string())),
            bracketed(members.iter().map(|m| role_token(&m.role).to_string())),
        ])?;
    }

    Ok(vec![
        elements.finish()?,
        nodes.finish()?,
        ways.finish()?,
        relations.finish()?,
    ])
}

fn export_per_kind(graph: &ElementGraph) -> Result<Vec<RenderedTable>> {
    let with_side_columns = |side: &[&str]| {
        let mut header = columns(&METADATA_COLUMNS);
        header.extend(columns(side));
        header.push("tags".to_string());
        header
    };

    let node_columns = with_side_columns(&["latitude", "longitude"]);
    let mut nodes = TableWriter::new("nodes.csv", &node_columns)?;
    for (element, node) in graph.nodes() {
        let mut row = metadata_fields(element).to_vec();
        row.push(format_coordinate(node.lat));
        row.push(format_coordinate(node.lon));
        row.push(tag_list(&element.tags));
        nodes.row(&row)?;
    }

    let mut ways = TableWriter::new("ways.csv", &with_side_columns(&["nodes"]))?;
    for (element, way) in graph.ways() {
        let mut row = metadata_fields(element).to_vec();
        row.push(id_list(way.nodes()));
        row.push(tag_list(&element.tags));
        ways.row(&row)?;
    }

    let mut relations = TableWriter::new("relations.csv", &with_side_columns(&["members"]))?;
    for (element, relation) in graph.relations() {
        let mut row = metadata_fields(element).to_vec();
        row.push(member_list(relation.members()));
        row.push(tag_list(&element.tags));
        relations.row(&row)?;
    }

    Ok(vec![nodes.finish()?, ways.finish()?, relations.finish()?])
}

/// Buffers one table through a `;` separated, never-quoting CSV writer
struct TableWriter {
    file_name: &'static str,
    writer: csv::Writer<Vec<u8>>,
}

impl TableWriter {
    fn new(file_name: &'static str, header: &[String]) -> Result<Self> {
        let mut writer = WriterBuilder::new()
            .delimiter(b';')
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(header)?;
        Ok(Self { file_name, writer })
    }

    fn row(&mut self, fields: &[String]) -> Result<()> {
        self.writer.write_record(fields)?;
        Ok(())
    }

    fn finish(self) -> Result<RenderedTable> {
        let bytes = self
            .writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        let contents = String::from_utf8(bytes)
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        Ok(RenderedTable {
            file_name: self.file_name,
            contents,
        })
    }
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn metadata_fields(element: &Element) -> [String; 6] {
    let meta = &element.meta;
    [
        element.id().to_string(),
        meta.uid.to_string(),
        meta.timestamp.clone().unwrap_or_else(|| NULL.to_string()),
        meta.visible.to_string(),
        meta.version.to_string(),
        meta.changeset.to_string(),
    ]
}

fn quoted(value: &str) -> String {
    format!("\"{value}\"")
}

/// `"[a,b,c]"`
fn bracketed(items: impl IntoIterator<Item = String>) -> String {
    let items: Vec<String> = items.into_iter().collect();
    quoted(&format!("[{}]", items.join(",")))
}

fn id_list(ids: &[ElementId]) -> String {
    bracketed(ids.iter().map(ToString::to_string))
}

fn member_list(members: &[Member]) -> String {
    bracketed(
        members
            .iter()
            .map(|m| format!("{}={}", m.id, role_token(&m.role))),
    )
}

fn tag_list(tags: &Tags) -> String {
    bracketed(tags.iter().map(|(k, v)| format!("{k}={v}")))
}

fn role_token(role: &str) -> &str {
    if role.is_empty() {
        NULL
    } else {
        role
    }
}

/// Shortest round-trip form, always with a fractional part (`12.0`, `54.09`).
/// Infinities are spelled out (`Infinity`, `-Infinity`).
fn format_coordinate(value: f64) -> String {
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        format!("{sign}Infinity")
    } else if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
