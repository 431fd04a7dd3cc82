//! OSM XML parser
//!
//! Single pass over the quick-xml event stream. Ways must reference nodes
//! that were already read; relation members may point anywhere, including
//! forward or outside the extract.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::core::error::{Error, Result};
use crate::core::graph::ElementGraph;
use crate::core::model::{Element, ElementData, ElementId, ElementKind, Metadata, Relation, Way};

/// Parse an OSM XML file
pub fn parse_file(path: &Path) -> Result<ElementGraph> {
    if !path.is_file() {
        return Err(Error::SourceNotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    parse_reader(BufReader::new(file))
}

/// Parse an OSM XML document held in memory
pub fn parse_str(xml: &str) -> Result<ElementGraph> {
    parse_reader(xml.as_bytes())
}

/// Parse OSM XML from any buffered reader.
///
/// Fails on the first malformed element or unresolved way node; no partial
/// graph is returned.
pub fn parse_reader<R: BufRead>(source: R) -> Result<ElementGraph> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(true);

    let mut state = ParseState::default();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                depth += 1;
                seen_root = true;
                state.start(&e)?;
            }
            Event::Empty(e) => {
                seen_root = true;
                state.start(&e)?;
                state.end(e.local_name().as_ref());
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                state.end(e.local_name().as_ref());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(Error::Truncated("no root element".to_string()));
    }
    if depth > 0 {
        return Err(Error::Truncated(format!(
            "input ended with {depth} unclosed element(s) at byte {}",
            reader.buffer_position()
        )));
    }

    debug!(
        "Parsed {} elements, dropped {} incomplete ways/relations",
        state.graph.len(),
        state.dropped
    );
    Ok(state.graph)
}

/// Parser-local state: the graph being built and the single open element
#[derive(Default)]
struct ParseState {
    graph: ElementGraph,
    current: Option<Element>,
    dropped: usize,
}

impl ParseState {
    fn start(&mut self, e: &BytesStart<'_>) -> Result<()> {
        match e.local_name().as_ref() {
            b"node" => {
                let id = required(e, "node", "id")?;
                let lat = coordinate(e, "lat")?;
                let lon = coordinate(e, "lon")?;
                self.open(Element::node(id, lat, lon), read_metadata(e, "node")?);
            }
            b"way" => {
                let id = required(e, "way", "id")?;
                self.open(Element::way(Way::new(id)), read_metadata(e, "way")?);
            }
            b"relation" => {
                let id = required(e, "relation", "id")?;
                self.open(
                    Element::relation(Relation::new(id)),
                    read_metadata(e, "relation")?,
                );
            }
            b"nd" => self.way_node(e)?,
            b"member" => self.relation_member(e)?,
            b"tag" => {
                if let Some(current) = self.current.as_mut() {
                    let key = attribute(e, "k")?.ok_or(Error::MissingAttribute {
                        element: "tag",
                        attribute: "k",
                    })?;
                    let value = attribute(e, "v")?.unwrap_or_default();
                    current.add_tag(key, value);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn open(&mut self, mut element: Element, meta: Metadata) {
        element.meta = meta;
        if let Some(unclosed) = self.current.replace(element) {
            debug!("Discarding unclosed element {}", unclosed.id());
        }
    }

    fn way_node(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let Some(Element {
            data: ElementData::Way(way),
            ..
        }) = self.current.as_mut()
        else {
            return Ok(());
        };

        let node = ElementId::node(required(e, "nd", "ref")?);
        if !self.graph.contains(&node) {
            return Err(Error::UnresolvedReference {
                way: ElementId::way(way.id),
                node,
            });
        }
        way.push_node(node);
        Ok(())
    }

    fn relation_member(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let Some(Element {
            data: ElementData::Relation(relation),
            ..
        }) = self.current.as_mut()
        else {
            return Ok(());
        };

        let type_name = attribute(e, "type")?.ok_or(Error::MissingAttribute {
            element: "member",
            attribute: "type",
        })?;
        let kind = ElementKind::from_osm_name(&type_name).ok_or(Error::InvalidAttribute {
            element: "member",
            attribute: "type",
            value: type_name.clone(),
        })?;
        let number = required(e, "member", "ref")?;
        let role = attribute(e, "role")?.unwrap_or_default();

        relation.add_member(ElementId::new(kind, number), role);
        Ok(())
    }

    fn end(&mut self, name: &[u8]) {
        if !matches!(name, b"node" | b"way" | b"relation") {
            return;
        }
        let Some(element) = self.current.take() else {
            return;
        };

        let keep = match &element.data {
            ElementData::Node(_) => true,
            ElementData::Way(way) => way.nodes().len() >= 2,
            ElementData::Relation(relation) => !relation.members().is_empty(),
        };

        if keep {
            self.graph.insert(element);
        } else {
            debug!("Dropping incomplete element {}", element.id());
            self.dropped += 1;
        }
    }
}

/// Attribute value by local name, XML-unescaped
fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Attribute parsed with `FromStr`; surrounding whitespace is not accepted
fn parsed<T: FromStr>(
    e: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<Option<T>> {
    match attribute(e, name)? {
        Some(text) => text.parse::<T>().map(Some).map_err(|_| Error::InvalidAttribute {
            element,
            attribute: name,
            value: text,
        }),
        None => Ok(None),
    }
}

fn required<T: FromStr>(
    e: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<T> {
    parsed(e, element, name)?.ok_or(Error::MissingAttribute {
        element,
        attribute: name,
    })
}

/// Coordinate attribute. Range is not checked, but the only non-finite
/// spellings accepted are `NaN`, `Infinity` and `-Infinity`.
fn coordinate(e: &BytesStart<'_>, name: &'static str) -> Result<f64> {
    let value: f64 = required(e, "node", name)?;
    if value.is_finite() {
        return Ok(value);
    }
    match attribute(e, name)?.as_deref() {
        Some("NaN" | "Infinity" | "+Infinity" | "-Infinity") => Ok(value),
        text => Err(Error::InvalidAttribute {
            element: "node",
            attribute: name,
            value: text.unwrap_or_default().to_string(),
        }),
    }
}

fn read_metadata(e: &BytesStart<'_>, element: &'static str) -> Result<Metadata> {
    let mut meta = Metadata {
        user: attribute(e, "user")?,
        timestamp: attribute(e, "timestamp")?,
        ..Metadata::default()
    };
    if let Some(uid) = parsed(e, element, "uid")? {
        meta.uid = uid;
    }
    if let Some(visible) = attribute(e, "visible")? {
        meta.visible = visible.trim().eq_ignore_ascii_case("true");
    }
    if let Some(version) = parsed(e, element, "version")? {
        meta.version = version;
    }
    if let Some(changeset) = parsed(e, element, "changeset")? {
        meta.changeset = changeset;
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../tests/data/sample.osm");

    fn wrap(body: &str) -> String {
        format!("<?xml version='1.0' encoding='UTF-8'?>\n<osm version=\"0.6\">\n{body}\n</osm>")
    }

    #[test]
    fn test_parse_sample_nodes() {
        let graph = parse_str(SAMPLE).unwrap();

        let n1 = graph.get(&ElementId::node(298884269)).unwrap();
        let node = n1.as_node().unwrap();
        assert_eq!(node.lat, 54.0901746);
        assert_eq!(node.lon, 12.2482632);
        assert_eq!(n1.meta.user.as_deref(), Some("SvenHRO"));
        assert_eq!(n1.meta.uid, 46882);
        assert!(n1.meta.visible);
        assert_eq!(n1.meta.version, 1);
        assert_eq!(n1.meta.changeset, 676636);
        assert_eq!(n1.meta.timestamp.as_deref(), Some("2008-09-21T21:37:45Z"));
        assert!(n1.tags.is_empty());

        let n2 = graph.get(&ElementId::node(1831881213)).unwrap();
        assert_eq!(n2.meta.user.as_deref(), Some("lafkor"));
        assert_eq!(n2.meta.changeset, 12370172);
        assert_eq!(n2.tags.len(), 2);
        assert_eq!(n2.tags["name"], "Neu Broderstorf");
        assert_eq!(n2.tags["traffic_sign"], "city_limit");
    }

    #[test]
    fn test_parse_sample_way() {
        let graph = parse_str(SAMPLE).unwrap();

        let w1 = graph.get(&ElementId::way(26659127)).unwrap();
        assert_eq!(w1.meta.user.as_deref(), Some("Masch"));
        assert_eq!(w1.meta.uid, 55988);
        assert_eq!(w1.meta.version, 5);
        assert_eq!(w1.meta.changeset, 4142606);
        assert_eq!(w1.tags["highway"], "unclassified");
        assert_eq!(w1.tags["name"], "Pastower Straße");
        assert_eq!(
            w1.as_way().unwrap().nodes(),
            &[
                ElementId::node(298884269),
                ElementId::node(298884272),
                ElementId::node(261728686)
            ]
        );
    }

    #[test]
    fn test_parse_sample_relation() {
        let graph = parse_str(SAMPLE).unwrap();

        let r1 = graph.get(&ElementId::relation(56688)).unwrap();
        assert_eq!(r1.meta.user.as_deref(), Some("kmvar"));
        assert_eq!(r1.meta.version, 28);
        assert_eq!(r1.tags.len(), 6);
        assert_eq!(r1.tags["name"], "Küstenbus Linie 123");
        assert_eq!(r1.tags["operator"], "Regionalverkehr Küste");

        let relation = r1.as_relation().unwrap();
        let ids: Vec<String> = relation.members().iter().map(|m| m.id.to_string()).collect();
        assert_eq!(ids, vec!["N298884269", "N261728686", "W26659127", "N298884272"]);
        assert_eq!(relation.role_of(ElementId::node(298884269)), Some("stop"));
        assert_eq!(relation.role_of(ElementId::node(261728686)), Some(""));
        assert_eq!(relation.role_of(ElementId::way(26659127)), Some("path"));
    }

    #[test]
    fn test_parse_sample_preserves_document_order() {
        let graph = parse_str(SAMPLE).unwrap();
        let ids: Vec<String> = graph.iter().map(|e| e.id().to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "N298884269",
                "N298884272",
                "N261728686",
                "N1831881213",
                "W26659127",
                "R56688"
            ]
        );
    }

    #[test]
    fn test_parse_file_matches_parse_str() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/sample.osm");
        let from_file = parse_file(&path).unwrap();
        let from_str = parse_str(SAMPLE).unwrap();
        assert_eq!(from_file.len(), from_str.len());
    }

    #[test]
    fn test_parse_file_missing_source() {
        let err = parse_file(Path::new("/definitely/not/here.osm")).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }

    #[test]
    fn test_short_ways_are_dropped() {
        let xml = wrap(
            r#"<node id="1" lat="0" lon="0"/>
            <node id="2" lat="1" lon="1"/>
            <way id="10"/>
            <way id="11"><nd ref="1"/></way>
            <way id="12"><nd ref="1"/><nd ref="2"/></way>"#,
        );
        let graph = parse_str(&xml).unwrap();
        assert!(!graph.contains(&ElementId::way(10)));
        assert!(!graph.contains(&ElementId::way(11)));
        assert!(graph.contains(&ElementId::way(12)));
    }

    #[test]
    fn test_empty_relations_are_dropped() {
        let xml = wrap(
            r#"<relation id="1"><tag k="type" v="route"/></relation>
            <relation id="2"><member type="node" ref="5" role=""/></relation>"#,
        );
        let graph = parse_str(&xml).unwrap();
        assert!(!graph.contains(&ElementId::relation(1)));
        assert!(graph.contains(&ElementId::relation(2)));
    }

    #[test]
    fn test_unresolved_way_node_fails_whole_parse() {
        let xml = wrap(
            r#"<node id="1" lat="0" lon="0"/>
            <way id="5"><nd ref="1"/><nd ref="2"/></way>
            <node id="2" lat="1" lon="1"/>"#,
        );
        match parse_str(&xml) {
            Err(Error::UnresolvedReference { way, node }) => {
                assert_eq!(way, ElementId::way(5));
                assert_eq!(node, ElementId::node(2));
            }
            other => panic!("Expected unresolved reference, got {other:?}"),
        }
    }

    #[test]
    fn test_relation_members_may_be_forward_or_missing() {
        let xml = wrap(
            r#"<relation id="1">
                <member type="relation" ref="2" role="sub"/>
                <member type="way" ref="404"/>
            </relation>
            <relation id="2"><member type="relation" ref="1" role="parent"/></relation>"#,
        );
        let graph = parse_str(&xml).unwrap();

        let relation = graph
            .get(&ElementId::relation(1))
            .and_then(Element::as_relation)
            .unwrap();
        assert_eq!(relation.members().len(), 2);
        assert_eq!(relation.members()[1].role, "");
        assert!(!graph.contains(&ElementId::way(404)));

        let placeholder = graph.resolve_member(&relation.members()[1]);
        assert!(placeholder.as_way().unwrap().nodes().is_empty());

        // The forward reference now resolves to the real record
        let forward = graph.resolve_member(&relation.members()[0]);
        assert_eq!(forward.as_relation().unwrap().members().len(), 1);
    }

    #[test]
    fn test_missing_required_attribute() {
        let err = parse_str(&wrap(r#"<node id="1" lat="0"/>"#)).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingAttribute {
                element: "node",
                attribute: "lon"
            }
        ));

        let err = parse_str(&wrap(r#"<way version="2"/>"#)).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingAttribute {
                element: "way",
                attribute: "id"
            }
        ));
    }

    #[test]
    fn test_malformed_numbers_are_fatal() {
        let err = parse_str(&wrap(r#"<node id="1" lat="north" lon="0"/>"#)).unwrap_err();
        match err {
            Error::InvalidAttribute {
                element,
                attribute,
                value,
            } => {
                assert_eq!(element, "node");
                assert_eq!(attribute, "lat");
                assert_eq!(value, "north");
            }
            other => panic!("Expected invalid attribute, got {other:?}"),
        }

        let err = parse_str(&wrap(r#"<node id="1" lat="0" lon="0" uid="abc"/>"#)).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { attribute: "uid", .. }));
    }

    #[test]
    fn test_unknown_member_type_is_fatal() {
        let xml = wrap(r#"<relation id="1"><member type="area" ref="1"/></relation>"#);
        let err = parse_str(&xml).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { attribute: "type", .. }));
    }

    #[test]
    fn test_optional_metadata_defaults() {
        let graph = parse_str(&wrap(r#"<node id="3" lat="100.5" lon="-200"/>"#)).unwrap();
        let element = graph.get(&ElementId::node(3)).unwrap();
        assert_eq!(element.meta, Metadata::default());

        // Out-of-range coordinates pass through unchanged
        let node = element.as_node().unwrap();
        assert_eq!((node.lat, node.lon), (100.5, -200.0));
    }

    #[test]
    fn test_visible_parsing() {
        let xml = wrap(
            r#"<node id="1" lat="0" lon="0" visible="false"/>
            <node id="2" lat="0" lon="0" visible="TRUE"/>
            <node id="3" lat="0" lon="0" visible="yes"/>"#,
        );
        let graph = parse_str(&xml).unwrap();
        assert!(!graph.get(&ElementId::node(1)).unwrap().meta.visible);
        assert!(graph.get(&ElementId::node(2)).unwrap().meta.visible);
        assert!(!graph.get(&ElementId::node(3)).unwrap().meta.visible);
    }

    #[test]
    fn test_stray_children_are_ignored() {
        let xml = wrap(
            r#"<tag k="orphan" v="1"/>
            <nd ref="1"/>
            <member type="node" ref="1"/>
            <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
            <node id="1" lat="0" lon="0"><nd ref="7"/><unknown/></node>"#,
        );
        let graph = parse_str(&xml).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.get(&ElementId::node(1)).unwrap().tags.is_empty());
    }

    #[test]
    fn test_tag_values_are_unescaped() {
        let xml = wrap(
            r#"<node id="1" lat="0" lon="0">
                <tag k="name" v="Fish &amp; Chips"/><tag k="note"/>
            </node>"#,
        );
        let graph = parse_str(&xml).unwrap();
        let node = graph.get(&ElementId::node(1)).unwrap();
        assert_eq!(node.tags["name"], "Fish & Chips");
        assert_eq!(node.tags["note"], "");
    }

    #[test]
    fn test_malformed_markup_is_fatal() {
        let xml = wrap(r#"<node id="1" lat="0" lon="0"></way>"#);
        assert!(matches!(parse_str(&xml), Err(Error::Xml(_))));
    }

    #[test]
    fn test_truncated_document_is_fatal() {
        let xml = r#"<osm>
            <node id="1" lat="1" lon="2"/>
            <node id="2" lat="3" lon="4"/>
            <way id="7"><nd ref="1"/><nd ref="2"/></way>
            <relation id="9"><member type="node" ref="1" role=""/>"#;
        assert!(matches!(parse_str(xml), Err(Error::Truncated(_))));

        let xml = r#"<osm><node id="1" lat="1" lon="2">"#;
        assert!(matches!(parse_str(xml), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_document_without_root_is_fatal() {
        assert!(matches!(parse_str(""), Err(Error::Truncated(_))));
        assert!(matches!(
            parse_str("<?xml version='1.0' encoding='UTF-8'?>\n"),
            Err(Error::Truncated(_))
        ));
    }

    #[test]
    fn test_empty_root_is_an_empty_graph() {
        assert!(parse_str("<osm/>").unwrap().is_empty());
        assert!(parse_str(&wrap("")).unwrap().is_empty());
    }

    #[test]
    fn test_padded_integers_are_rejected() {
        let err = parse_str(&wrap(r#"<node id=" 1" lat="0" lon="0"/>"#)).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { attribute: "id", .. }));

        let err = parse_str(&wrap(r#"<node id="1" lat="0" lon="0" version="2 "/>"#)).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { attribute: "version", .. }));
    }

    #[test]
    fn test_non_finite_coordinates() {
        let xml = wrap(
            r#"<node id="1" lat="NaN" lon="Infinity"/>
            <node id="2" lat="0" lon="-Infinity"/>"#,
        );
        let graph = parse_str(&xml).unwrap();
        let first = graph.get(&ElementId::node(1)).and_then(Element::as_node).unwrap();
        assert!(first.lat.is_nan());
        assert_eq!(first.lon, f64::INFINITY);
        let second = graph.get(&ElementId::node(2)).and_then(Element::as_node).unwrap();
        assert_eq!(second.lon, f64::NEG_INFINITY);

        for spelling in ["inf", "infinity", "-inf", "nan"] {
            let xml = wrap(&format!(r#"<node id="1" lat="{spelling}" lon="0"/>"#));
            match parse_str(&xml) {
                Err(Error::InvalidAttribute { attribute, value, .. }) => {
                    assert_eq!(attribute, "lat");
                    assert_eq!(value, spelling);
                }
                other => panic!("Expected invalid attribute for {spelling}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_ways_share_nodes() {
        let xml = wrap(
            r#"<node id="1" lat="0" lon="0"/>
            <node id="2" lat="0" lon="1"/>
            <node id="3" lat="0" lon="2"/>
            <way id="1"><nd ref="1"/><nd ref="2"/></way>
            <way id="2"><nd ref="2"/><nd ref="3"/></way>"#,
        );
        let graph = parse_str(&xml).unwrap();
        let first = graph.get(&ElementId::way(1)).and_then(Element::as_way).unwrap();
        let second = graph.get(&ElementId::way(2)).and_then(Element::as_way).unwrap();
        assert_eq!(first.nodes()[1], second.nodes()[0]);
    }
}
