// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Structural tree of an elaborated VHDL design as reported by the simulator.

use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;
use std::ops::Index;

/// Uniquely identifies a unit in a [`UnitTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitRef(NonZeroU32);

impl UnitRef {
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        NonZeroU32::new(index as u32 + 1).map(Self)
    }

    #[inline]
    pub fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

const TOP_REF: UnitRef = UnitRef(NonZeroU32::MIN);
const TOP_NAME: &str = "top";
const NAME_SEPARATOR: char = '.';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum GenerateKind {
    If,
    For,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum PortDirection {
    In,
    Out,
    InOut,
    Buffer,
    Linkage,
}

impl PortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "in" => Some(PortDirection::In),
            "out" => Some(PortDirection::Out),
            "inout" => Some(PortDirection::InOut),
            "buffer" => Some(PortDirection::Buffer),
            "linkage" => Some(PortDirection::Linkage),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            PortDirection::In => "in",
            PortDirection::Out => "out",
            PortDirection::InOut => "inout",
            PortDirection::Buffer => "buffer",
            PortDirection::Linkage => "linkage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitKind {
    /// Root of every tree. Its only child is the top-level entity.
    Top { packages: Vec<String> },
    Entity { architecture: Option<String> },
    Instance,
    /// `value` is the guard: whether the generate condition was true during elaboration.
    Generate { kind: GenerateKind, value: bool },
    Process,
    Port { direction: Option<PortDirection> },
    Signal,
}

impl UnitKind {
    /// The tag used for this kind in the simulator's hierarchy dump.
    pub fn tag(&self) -> &'static str {
        match self {
            UnitKind::Top { .. } => "top",
            UnitKind::Entity { .. } => "entity",
            UnitKind::Instance => "instance",
            UnitKind::Generate {
                kind: GenerateKind::If,
                ..
            } => "if-generate",
            UnitKind::Generate {
                kind: GenerateKind::For,
                ..
            } => "for-generate",
            UnitKind::Process => "process",
            UnitKind::Port { .. } => "port",
            UnitKind::Signal => "signal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    name: String,
    kind: UnitKind,
    parent: Option<UnitRef>,
    children: Vec<UnitRef>,
}

impl Unit {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<UnitRef> {
        self.parent
    }

    /// Children in the order in which they were reported.
    pub fn children(&self) -> &[UnitRef] {
        &self.children
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.kind, UnitKind::Entity { .. })
    }

    pub fn architecture(&self) -> Option<&str> {
        match &self.kind {
            UnitKind::Entity { architecture } => architecture.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitTree {
    units: Vec<Unit>,
}

impl UnitTree {
    pub fn top(&self) -> UnitRef {
        TOP_REF
    }

    /// The top-level entity.
    pub fn entity(&self) -> UnitRef {
        self[TOP_REF].children[0]
    }

    /// Packages referenced by the design, in the order they were reported.
    pub fn packages(&self) -> &[String] {
        match &self[TOP_REF].kind {
            UnitKind::Top { packages } => packages,
            _ => unreachable!("the first unit is always the top"),
        }
    }

    /// Number of units including the top.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Depth first walk over all units below the top, in the order they were reported.
    pub fn iter(&self) -> impl Iterator<Item = UnitRef> + '_ {
        let mut todo = vec![self.entity()];
        std::iter::from_fn(move || {
            let next = todo.pop()?;
            todo.extend(self[next].children.iter().rev());
            Some(next)
        })
    }

    /// Number of ancestors, the top-level entity is at depth 1.
    pub fn depth(&self, unit: UnitRef) -> usize {
        let mut depth = 0;
        let mut parent = self[unit].parent;
        while let Some(p) = parent {
            depth += 1;
            parent = self[p].parent;
        }
        depth
    }

    /// Dot separated path starting at the top-level entity.
    pub fn full_name(&self, unit: UnitRef) -> String {
        let mut names = vec![self[unit].name()];
        let mut parent = self[unit].parent;
        while let Some(p) = parent.filter(|p| *p != TOP_REF) {
            names.push(self[p].name());
            parent = self[p].parent;
        }
        let mut out = String::new();
        for (ii, name) in names.iter().rev().enumerate() {
            if ii > 0 {
                out.push(NAME_SEPARATOR);
            }
            out.push_str(name);
        }
        out
    }

    /// Finds a unit by its path of names, starting with the top-level entity.
    pub fn lookup<N: AsRef<str>>(&self, names: &[N]) -> Option<UnitRef> {
        let (first, rest) = names.split_first()?;
        let mut unit = Some(self.entity()).filter(|e| self[*e].name() == first.as_ref())?;
        for name in rest {
            unit = self[unit]
                .children
                .iter()
                .copied()
                .find(|c| self[*c].name() == name.as_ref())?;
        }
        Some(unit)
    }

    pub fn instances(&self, unit: UnitRef) -> impl Iterator<Item = UnitRef> + '_ {
        self.children_where(unit, |k| matches!(k, UnitKind::Instance))
    }

    pub fn generates(&self, unit: UnitRef) -> impl Iterator<Item = UnitRef> + '_ {
        self.children_where(unit, |k| matches!(k, UnitKind::Generate { .. }))
    }

    pub fn processes(&self, unit: UnitRef) -> impl Iterator<Item = UnitRef> + '_ {
        self.children_where(unit, |k| matches!(k, UnitKind::Process))
    }

    pub fn ports(&self, unit: UnitRef) -> impl Iterator<Item = UnitRef> + '_ {
        self.children_where(unit, |k| matches!(k, UnitKind::Port { .. }))
    }

    pub fn signals(&self, unit: UnitRef) -> impl Iterator<Item = UnitRef> + '_ {
        self.children_where(unit, |k| matches!(k, UnitKind::Signal))
    }

    /// The entity instantiated by an instance.
    pub fn instantiated_entity(&self, instance: UnitRef) -> Option<UnitRef> {
        self.children_where(instance, |k| matches!(k, UnitKind::Entity { .. }))
            .next()
    }

    fn children_where(
        &self,
        unit: UnitRef,
        filter: impl Fn(&UnitKind) -> bool + 'static,
    ) -> impl Iterator<Item = UnitRef> + '_ {
        self[unit]
            .children
            .iter()
            .copied()
            .filter(move |c| filter(&self[*c].kind))
    }

    fn fmt_unit(&self, f: &mut Formatter<'_>, unit: UnitRef, indent: usize) -> std::fmt::Result {
        let u = &self[unit];
        write!(f, "{:indent$}{} [{}", "", u.name, u.kind.tag(), indent = indent * 2)?;
        match &u.kind {
            UnitKind::Generate { value, .. } => write!(f, " {value}")?,
            UnitKind::Port {
                direction: Some(dir),
            } => write!(f, " {}", dir.keyword())?,
            _ => {}
        }
        writeln!(f, "]")?;
        let child_indent = match u.architecture() {
            Some(arch) => {
                writeln!(f, "{:indent$}{arch} [arch]", "", indent = (indent + 1) * 2)?;
                indent + 2
            }
            None => indent + 1,
        };
        for child in u.children.iter() {
            self.fmt_unit(f, *child, child_indent)?;
        }
        Ok(())
    }
}

/// Prints the tree in the same indented format that the simulator uses.
impl Display for UnitTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for package in self.packages() {
            writeln!(f, "{package} [package]")?;
        }
        self.fmt_unit(f, self.entity(), 0)
    }
}

impl Index<UnitRef> for UnitTree {
    type Output = Unit;

    fn index(&self, index: UnitRef) -> &Self::Output {
        &self.units[index.index()]
    }
}

pub struct UnitTreeBuilder {
    units: Vec<Unit>,
}

impl UnitTreeBuilder {
    /// Starts a tree with the top and the top-level entity.
    pub fn new(entity: impl Into<String>, architecture: Option<String>) -> Self {
        let top = Unit {
            name: TOP_NAME.to_string(),
            kind: UnitKind::Top {
                packages: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        let mut builder = Self { units: vec![top] };
        builder.add_unit(TOP_REF, entity, UnitKind::Entity { architecture });
        builder
    }

    pub fn top(&self) -> UnitRef {
        TOP_REF
    }

    pub fn entity(&self) -> UnitRef {
        self.units[TOP_REF.index()].children[0]
    }

    pub fn add_unit(&mut self, parent: UnitRef, name: impl Into<String>, kind: UnitKind) -> UnitRef {
        assert!(
            !matches!(kind, UnitKind::Top { .. }),
            "there can only be one top"
        );
        let id = UnitRef::from_index(self.units.len()).unwrap();
        self.units.push(Unit {
            name: name.into(),
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.units[parent.index()].children.push(id);
        id
    }

    pub fn set_architecture(&mut self, unit: UnitRef, name: impl Into<String>) {
        match &mut self.units[unit.index()].kind {
            UnitKind::Entity { architecture } => *architecture = Some(name.into()),
            other => panic!("cannot set the architecture of a {}", other.tag()),
        }
    }

    pub fn add_package(&mut self, name: impl Into<String>) {
        if let UnitKind::Top { packages } = &mut self.units[TOP_REF.index()].kind {
            packages.push(name.into());
        }
    }

    pub fn finish(mut self) -> UnitTree {
        self.units.shrink_to_fit();
        UnitTree { units: self.units }
    }
}

impl Index<UnitRef> for UnitTreeBuilder {
    type Output = Unit;

    fn index(&self, index: UnitRef) -> &Self::Output {
        &self.units[index.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_example() -> UnitTree {
        let mut b = UnitTreeBuilder::new("tb", Some("sim".to_string()));
        let tb = b.entity();
        b.add_package("pkg_data");
        let clk = b.add_unit(tb, "clk", UnitKind::Signal);
        let gen = b.add_unit(
            tb,
            "g_dut",
            UnitKind::Generate {
                kind: GenerateKind::If,
                value: true,
            },
        );
        let dut = b.add_unit(gen, "dut", UnitKind::Instance);
        let adder = b.add_unit(dut, "adder", UnitKind::Entity { architecture: None });
        b.set_architecture(adder, "rtl");
        b.add_unit(
            adder,
            "a",
            UnitKind::Port {
                direction: Some(PortDirection::In),
            },
        );
        b.add_unit(adder, "p_sum", UnitKind::Process);
        assert_eq!(b[clk].name(), "clk");
        b.finish()
    }

    #[test]
    fn test_sizes() {
        assert_eq!(std::mem::size_of::<UnitRef>(), 4);
        assert_eq!(
            std::mem::size_of::<Option<UnitRef>>(),
            std::mem::size_of::<UnitRef>()
        );
    }

    #[test]
    fn test_navigation() {
        let t = build_example();
        assert_eq!(t.len(), 8);
        assert_eq!(t.packages(), ["pkg_data"]);
        let tb = t.entity();
        assert_eq!(t[tb].architecture(), Some("sim"));
        assert_eq!(t[tb].parent(), Some(t.top()));

        let gen = t.generates(tb).next().unwrap();
        let dut = t.instances(gen).next().unwrap();
        let adder = t.instantiated_entity(dut).unwrap();
        assert_eq!(t[adder].architecture(), Some("rtl"));
        assert_eq!(t.ports(adder).count(), 1);
        assert_eq!(t.processes(adder).count(), 1);
        assert_eq!(t.signals(tb).count(), 1);
        assert_eq!(t.depth(adder), 4);
        assert_eq!(t.full_name(adder), "tb.g_dut.dut.adder");
        assert_eq!(t.lookup(&["tb", "g_dut", "dut", "adder"]), Some(adder));
        assert_eq!(t.lookup(&["tb", "nope"]), None);
        assert_eq!(t.lookup(&["adder"]), None);
    }

    #[test]
    fn test_iter_is_preorder() {
        let t = build_example();
        let names: Vec<_> = t.iter().map(|u| t[u].name()).collect();
        assert_eq!(names, ["tb", "clk", "g_dut", "dut", "adder", "a", "p_sum"]);
    }

    #[test]
    fn test_display() {
        let t = build_example();
        let expected = "pkg_data [package]
tb [entity]
  sim [arch]
    clk [signal]
    g_dut [if-generate true]
      dut [instance]
        adder [entity]
          rtl [arch]
            a [port in]
            p_sum [process]
";
        assert_eq!(t.to_string(), expected);
    }
}
