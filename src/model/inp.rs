//! Reference network model backed by an EPANET `.inp` file.
//!
//! Only element identifiers and link connectivity are read. Curves,
//! patterns, options and everything else hydraulic are ignored.

use super::{Element, ElementKind, ModelError, NetworkModel, Zone};
use crate::records::PointRecord;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InpSection {
    Junctions,
    Reservoirs,
    Tanks,
    Pipes,
    Pumps,
    Valves,
    Status,
    Other,
}

impl InpSection {
    fn from_header(header: &str) -> Self {
        match header.to_ascii_uppercase().as_str() {
            "[JUNCTIONS]" => InpSection::Junctions,
            "[RESERVOIRS]" => InpSection::Reservoirs,
            "[TANKS]" => InpSection::Tanks,
            "[PIPES]" => InpSection::Pipes,
            "[PUMPS]" => InpSection::Pumps,
            "[VALVES]" => InpSection::Valves,
            "[STATUS]" => InpSection::Status,
            _ => InpSection::Other,
        }
    }
}

/// Connectivity of one link
#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkEnds {
    id: String,
    from: String,
    to: String,
    initially_closed: bool,
}

#[derive(Debug, Default)]
pub struct InpModel {
    elements: Vec<Element>,
    links: Vec<LinkEnds>,
    zones: Vec<Zone>,
    hydraulic_step: Option<u64>,
    quality_step: Option<u64>,
    storage: Option<Rc<PointRecord>>,
}

impl InpModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model with a fixed element list and no connectivity
    pub fn with_elements(elements: Vec<Element>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    /// Parse the text of an `.inp` file, replacing anything loaded before.
    pub fn parse(&mut self, text: &str, path: &str) -> Result<(), ModelError> {
        let mut elements = Vec::new();
        let mut links: Vec<LinkEnds> = Vec::new();
        let mut statuses: HashMap<String, bool> = HashMap::new();
        let mut section = InpSection::Other;

        for (index, raw) in text.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                section = InpSection::from_header(line);
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let parse_error = |message: String| ModelError::Parse {
                path: path.to_string(),
                line: index + 1,
                message,
            };

            match section {
                InpSection::Junctions => elements.push(Element::new(tokens[0], ElementKind::Junction)),
                InpSection::Reservoirs => elements.push(Element::new(tokens[0], ElementKind::Reservoir)),
                InpSection::Tanks => elements.push(Element::new(tokens[0], ElementKind::Tank)),
                InpSection::Pipes | InpSection::Pumps | InpSection::Valves => {
                    if tokens.len() < 3 {
                        return Err(parse_error(format!(
                            "link '{}' needs an id and two end nodes",
                            tokens[0]
                        )));
                    }
                    let kind = match section {
                        InpSection::Pipes => ElementKind::Pipe,
                        InpSection::Pumps => ElementKind::Pump,
                        _ => ElementKind::Valve,
                    };
                    // pipe status is the eighth column
                    let initially_closed = kind == ElementKind::Pipe
                        && tokens.get(7).is_some_and(|s| s.eq_ignore_ascii_case("closed"));
                    elements.push(Element::new(tokens[0], kind));
                    links.push(LinkEnds {
                        id: tokens[0].to_string(),
                        from: tokens[1].to_string(),
                        to: tokens[2].to_string(),
                        initially_closed,
                    });
                }
                InpSection::Status => {
                    if tokens.len() < 2 {
                        return Err(parse_error(format!("status for '{}' has no value", tokens[0])));
                    }
                    // sections may come in any order; applied once every link is known
                    statuses.insert(tokens[0].to_string(), tokens[1].eq_ignore_ascii_case("closed"));
                }
                InpSection::Other => {}
            }
        }

        for (id, closed) in statuses {
            match links.iter_mut().find(|l| l.id == id) {
                Some(link) => link.initially_closed = closed,
                None => debug!("Status line for unknown link '{}' ignored", id),
            }
        }

        self.elements = elements;
        self.links = links;
        self.zones.clear();
        Ok(())
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Disjoint-set forest over node indices
struct Components {
    parent: Vec<usize>,
}

impl Components {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

impl NetworkModel for InpModel {
    fn load_from_file(&mut self, path: &Path) -> Result<(), ModelError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: display.clone(),
            source,
        })?;
        self.parse(&text, &display)?;
        info!(
            "Loaded model '{}': {} node(s), {} link(s)",
            display,
            self.junctions().len(),
            self.pipes().len()
        );
        Ok(())
    }

    fn elements(&self) -> &[Element] {
        &self.elements
    }

    fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    fn zones(&self) -> &[Zone] {
        &self.zones
    }

    fn zones_mut(&mut self) -> &mut [Zone] {
        &mut self.zones
    }

    fn init_demand_zones(&mut self, detect_closed_links: bool) {
        let nodes: Vec<&Element> = self.elements.iter().filter(|e| e.kind().is_node()).collect();
        let position: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id(), i))
            .collect();

        let mut components = Components::new(nodes.len());
        for link in &self.links {
            if detect_closed_links && link.initially_closed {
                continue;
            }
            if let (Some(&a), Some(&b)) = (position.get(link.from.as_str()), position.get(link.to.as_str())) {
                components.union(a, b);
            }
        }

        // keyed by the first node index of each component so zone order follows the file
        let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        let mut first_of: HashMap<usize, usize> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            let root = components.find(i);
            let key = *first_of.entry(root).or_insert(i);
            if node.kind() == ElementKind::Junction {
                groups.entry(key).or_default().push(node.id().to_string());
            }
        }

        self.zones = groups
            .into_values()
            .filter(|junctions| !junctions.is_empty())
            .enumerate()
            .map(|(i, junctions)| Zone::new(format!("zone_{}", i + 1), junctions))
            .collect();
        info!("Detected {} demand zone(s)", self.zones.len());
    }

    fn set_hydraulic_time_step(&mut self, seconds: u64) {
        self.hydraulic_step = Some(seconds);
    }

    fn hydraulic_time_step(&self) -> Option<u64> {
        self.hydraulic_step
    }

    fn set_quality_time_step(&mut self, seconds: u64) {
        self.quality_step = Some(seconds);
    }

    fn quality_time_step(&self) -> Option<u64> {
        self.quality_step
    }

    fn set_storage(&mut self, record: Rc<PointRecord>) {
        self.storage = Some(record);
    }

    fn storage(&self) -> Option<&Rc<PointRecord>> {
        self.storage.as_ref()
    }
}
