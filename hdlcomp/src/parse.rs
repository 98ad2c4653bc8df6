// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Parser for the design hierarchy that GHDL prints after elaboration, e.g.:
//
// ```text
// tb [entity]
//   sim [arch]
//     dut [instance]
//       counter [entity]
//         rtl [arch]
//           clk [port in]
//           p_count [process]
// ```

use crate::units::{GenerateKind, PortDirection, UnitKind, UnitRef, UnitTree, UnitTreeBuilder};
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("[hierarchy] line {line}: expected `<name> [<kind>]`, not `{text}`")]
    MalformedLine { line: usize, text: String },
    #[error("[hierarchy] line {line}: unknown unit kind `{kind}`, valid are: {list:?}", list = KIND_TAGS)]
    UnknownKind { line: usize, kind: String },
    #[error("[hierarchy] line {line}: indentation of {indent} is not a multiple of the tab width {tab_width}")]
    MisalignedIndentation {
        line: usize,
        indent: usize,
        tab_width: usize,
    },
    #[error("[hierarchy] line {line}: unexpected indentation depth {depth} after depth {previous}")]
    InvalidIndentation {
        line: usize,
        depth: usize,
        previous: usize,
    },
    #[error("[hierarchy] line {line}: no parent found for depth {depth}")]
    ParentNotFound { line: usize, depth: usize },
    #[error("[hierarchy] no top-level entity found")]
    MissingEntity,
    #[error("[hierarchy] line {line}: expected the architecture of the top-level entity")]
    MissingArchitecture { line: usize },
    #[error("[hierarchy] line {line}: architecture `{name}` does not belong to an entity")]
    ArchitectureWithoutEntity { line: usize, name: String },
    #[error("[hierarchy] line {line}: invalid {kind} argument `{payload}`")]
    InvalidPayload {
        line: usize,
        kind: &'static str,
        payload: String,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseOptions {
    /// Number of indentation characters per hierarchy level. Zero is treated as one.
    pub tab_width: usize,
    /// Number of trailing lines that do not describe the hierarchy.
    pub epilogue_lines: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            tab_width: 2,
            epilogue_lines: 2,
        }
    }
}

const KIND_TAGS: &[&str] = &[
    "entity",
    "instance",
    "arch",
    "package",
    "if-generate",
    "for-generate",
    "process",
    "port",
    "signal",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Entity,
    Instance,
    Arch,
    Package,
    IfGenerate,
    ForGenerate,
    Process,
    Port,
    Signal,
}

impl LineKind {
    fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "entity" => LineKind::Entity,
            "instance" => LineKind::Instance,
            "arch" => LineKind::Arch,
            "package" => LineKind::Package,
            "if-generate" => LineKind::IfGenerate,
            "for-generate" => LineKind::ForGenerate,
            "process" => LineKind::Process,
            "port" => LineKind::Port,
            "signal" => LineKind::Signal,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line<'a> {
    /// number of characters before the name
    indent: usize,
    name: &'a str,
    tag: &'a str,
    payload: Option<&'a str>,
}

/// Splits `<indent><name> [<tag> <payload>]`. The indentation is everything in front of the
/// first word character, which covers plain spaces as well as tree drawing characters.
fn split_line(text: &str) -> Option<Line<'_>> {
    let start = text.find(|c: char| c.is_alphanumeric() || c == '_')?;
    let rest = &text[start..];
    let open = rest.find('[')?;
    let close = open + rest[open..].find(']')?;
    let name = rest[..open].trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    let inner = rest[open + 1..close].trim();
    let (tag, payload) = match inner.split_once(char::is_whitespace) {
        Some((tag, payload)) => (tag, Some(payload.trim())),
        None => (inner, None),
    };
    Some(Line {
        indent: text[..start].chars().count(),
        name,
        tag,
        payload,
    })
}

fn parse_generate_value(line: usize, payload: Option<&str>) -> Result<bool, ParseError> {
    match payload.map(|p| p.to_ascii_lowercase()) {
        None => Ok(true),
        Some(p) if p == "true" => Ok(true),
        Some(p) if p == "false" => Ok(false),
        Some(p) => Err(ParseError::InvalidPayload {
            line,
            kind: "generate",
            payload: p,
        }),
    }
}

fn parse_port_direction(
    line: usize,
    payload: Option<&str>,
) -> Result<Option<PortDirection>, ParseError> {
    match payload {
        None => Ok(None),
        Some(p) => PortDirection::parse(p)
            .map(Some)
            .ok_or_else(|| ParseError::InvalidPayload {
                line,
                kind: "port",
                payload: p.to_string(),
            }),
    }
}

/// A unit that can still receive children.
#[derive(Debug, Clone, Copy)]
struct OpenUnit {
    unit: UnitRef,
    depth: usize,
}

struct HierarchyParser {
    tab_width: usize,
    builder: UnitTreeBuilder,
    /// Ancestors of the next unit, ordered by strictly increasing depth.
    /// The last entry is the most recently opened unit.
    open: Vec<OpenUnit>,
}

impl HierarchyParser {
    fn depth(&self, line_no: usize, line: &Line) -> Result<usize, ParseError> {
        if line.indent % self.tab_width != 0 {
            return Err(ParseError::MisalignedIndentation {
                line: line_no,
                indent: line.indent,
                tab_width: self.tab_width,
            });
        }
        Ok(line.indent / self.tab_width)
    }

    fn current(&self) -> OpenUnit {
        // the top-level entity is only ever closed right before a parse error
        self.open[self.open.len() - 1]
    }

    /// Closes units according to the indentation of the new unit and returns its parent.
    fn resolve_parent(&mut self, line: usize, depth: usize) -> Result<UnitRef, ParseError> {
        let previous = self.current().depth;
        let not_found = ParseError::ParentNotFound { line, depth };
        if depth == previous + 1 {
            Ok(self.current().unit)
        } else if depth == previous {
            self.open.pop();
            self.open.last().map(|o| o.unit).ok_or(not_found)
        } else if depth < previous {
            while self.open.last().is_some_and(|o| o.depth > depth) {
                self.open.pop();
            }
            match self.open.pop() {
                Some(sibling) if sibling.depth == depth => {
                    self.open.last().map(|o| o.unit).ok_or(not_found)
                }
                _ => Err(not_found),
            }
        } else {
            Err(ParseError::InvalidIndentation {
                line,
                depth,
                previous,
            })
        }
    }

    fn add_unit(
        &mut self,
        line_no: usize,
        line: &Line,
        kind: UnitKind,
    ) -> Result<(), ParseError> {
        let depth = self.depth(line_no, line)?;
        let parent = self.resolve_parent(line_no, depth)?;
        let unit = self.builder.add_unit(parent, line.name, kind);
        self.open.push(OpenUnit { unit, depth });
        Ok(())
    }

    fn set_architecture(&mut self, line_no: usize, line: &Line) -> Result<(), ParseError> {
        let depth = self.depth(line_no, line)?;
        let current = self.current();
        if !self.builder[current.unit].is_entity() {
            return Err(ParseError::ArchitectureWithoutEntity {
                line: line_no,
                name: line.name.to_string(),
            });
        }
        if depth != current.depth && depth != current.depth + 1 {
            return Err(ParseError::InvalidIndentation {
                line: line_no,
                depth,
                previous: current.depth,
            });
        }
        self.builder.set_architecture(current.unit, line.name);
        // children of the entity are indented relative to its architecture
        let last = self.open.len() - 1;
        self.open[last].depth = depth;
        Ok(())
    }

    fn process_line(&mut self, line_no: usize, text: &str) -> Result<(), ParseError> {
        let line = split_line(text).ok_or_else(|| ParseError::MalformedLine {
            line: line_no,
            text: text.to_string(),
        })?;
        let kind = LineKind::from_tag(line.tag).ok_or_else(|| ParseError::UnknownKind {
            line: line_no,
            kind: line.tag.to_string(),
        })?;
        log::trace!("line {line_no}: {} [{}]", line.name, line.tag);
        match kind {
            LineKind::Entity => self.add_unit(line_no, &line, UnitKind::Entity { architecture: None }),
            LineKind::Instance => self.add_unit(line_no, &line, UnitKind::Instance),
            LineKind::IfGenerate | LineKind::ForGenerate => {
                let value = parse_generate_value(line_no, line.payload)?;
                let kind = if kind == LineKind::IfGenerate {
                    GenerateKind::If
                } else {
                    GenerateKind::For
                };
                self.add_unit(line_no, &line, UnitKind::Generate { kind, value })
            }
            LineKind::Process => self.add_unit(line_no, &line, UnitKind::Process),
            LineKind::Port => {
                let direction = parse_port_direction(line_no, line.payload)?;
                self.add_unit(line_no, &line, UnitKind::Port { direction })
            }
            LineKind::Signal => self.add_unit(line_no, &line, UnitKind::Signal),
            LineKind::Arch => self.set_architecture(line_no, &line),
            LineKind::Package => {
                self.builder.add_package(line.name);
                Ok(())
            }
        }
    }
}

/// Parses the hierarchy with the default [`ParseOptions`].
pub fn parse_hierarchy(text: &str) -> Result<UnitTree, ParseError> {
    parse_hierarchy_with_options(text, &ParseOptions::default())
}

pub fn parse_hierarchy_with_options(
    text: &str,
    options: &ParseOptions,
) -> Result<UnitTree, ParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let body_end = lines.len().saturating_sub(options.epilogue_lines);
    log::debug!("parsing hierarchy from {body_end} lines");

    // everything before the first entity is preamble, only packages are of interest
    let mut packages = Vec::new();
    let mut entity_idx = None;
    for (ii, text) in lines[..body_end].iter().enumerate() {
        match split_line(text) {
            Some(line) if line.tag == "entity" => {
                entity_idx = Some((ii, line.name));
                break;
            }
            Some(line) if line.tag == "package" => packages.push(line.name),
            _ if text.trim().is_empty() => {}
            _ => log::warn!("ignoring line {} before the top-level entity: {text}", ii + 1),
        }
    }
    let (entity_idx, entity_name) = entity_idx.ok_or(ParseError::MissingEntity)?;

    let arch_idx = entity_idx + 1;
    let arch = lines[..body_end]
        .get(arch_idx)
        .and_then(|text| split_line(text))
        .filter(|line| line.tag == "arch")
        .ok_or(ParseError::MissingArchitecture { line: arch_idx + 1 })?;

    let mut builder = UnitTreeBuilder::new(entity_name, Some(arch.name.to_string()));
    for package in packages {
        builder.add_package(package);
    }
    let tab_width = options.tab_width.max(1);
    let mut parser = HierarchyParser {
        tab_width,
        open: Vec::new(),
        builder,
    };
    let root = OpenUnit {
        unit: parser.builder.entity(),
        depth: parser.depth(arch_idx + 1, &arch)?,
    };
    parser.open.push(root);

    for (ii, text) in lines[..body_end].iter().enumerate().skip(arch_idx + 1) {
        if text.trim().is_empty() {
            continue;
        }
        parser.process_line(ii + 1, text)?;
    }

    let tree = parser.builder.finish();
    log::debug!(
        "parsed {} units and {} packages",
        tree.len(),
        tree.packages().len()
    );
    Ok(tree)
}

impl FromStr for UnitTree {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hierarchy(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum LibraryUnitKind {
    Entity,
    Package,
}

/// A design unit reported while importing source files into the simulator's library.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct ImportedUnit {
    pub kind: LibraryUnitKind,
    pub name: String,
}

/// Extracts all `entity <name>` and `package <name>` pairs from the import output.
pub fn parse_imported_units(output: &str) -> Vec<ImportedUnit> {
    let tokens: Vec<&str> = output.split_whitespace().collect();
    tokens
        .windows(2)
        .filter_map(|pair| {
            let kind = match pair[0] {
                "entity" => LibraryUnitKind::Entity,
                "package" => LibraryUnitKind::Package,
                _ => return None,
            };
            let end = pair[1]
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(pair[1].len());
            let name = &pair[1][..end];
            (!name.is_empty()).then(|| ImportedUnit {
                kind,
                name: name.to_string(),
            })
        })
        .collect()
}
