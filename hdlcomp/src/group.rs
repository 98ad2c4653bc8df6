// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::{Clock, Constant, ReadResult, Tick, Value, ValueType, Waveform};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::any::Any;
use std::fmt::{Display, Formatter};

/// Insertion ordered map, all results of a group preserve the order of its elements.
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("element `{0}` is neither a waveform nor a constant")]
    TypeMismatch(String),
    #[error("tick {tick} of `{name}` does not fit into an integer array")]
    TickOutOfRange { name: String, tick: Tick },
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    Waveform(Waveform),
    Constant(Constant),
}

impl From<Waveform> for Element {
    fn from(value: Waveform) -> Self {
        Element::Waveform(value)
    }
}

impl From<Constant> for Element {
    fn from(value: Constant) -> Self {
        Element::Constant(value)
    }
}

impl TryFrom<Box<dyn Any>> for Element {
    type Error = Box<dyn Any>;

    fn try_from(value: Box<dyn Any>) -> Result<Self, Self::Error> {
        let value = match value.downcast::<Waveform>() {
            Ok(w) => return Ok(Element::Waveform(*w)),
            Err(other) => other,
        };
        let value = match value.downcast::<Constant>() {
            Ok(c) => return Ok(Element::Constant(*c)),
            Err(other) => other,
        };
        value.downcast::<Element>().map(|e| *e)
    }
}

/// One named array handed to the package emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub name: String,
    pub data: Vec<Value>,
    pub tpe: Option<ValueType>,
    pub width: Option<u32>,
}

/// Named waveforms and constants that are written or read together.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalGroup {
    elements: FxIndexMap<String, Element>,
}

impl SignalGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds elements to the group. An element with an existing name replaces the old one
    /// but keeps its position.
    pub fn append<N, E>(&mut self, elements: impl IntoIterator<Item = (N, E)>)
    where
        N: Into<String>,
        E: Into<Element>,
    {
        for (name, element) in elements {
            self.elements.insert(name.into(), element.into());
        }
    }

    /// Like [`SignalGroup::append`] for type erased values. Nothing is added unless every
    /// value is a [`Waveform`], a [`Constant`] or an [`Element`].
    pub fn append_any<N: Into<String>>(
        &mut self,
        elements: impl IntoIterator<Item = (N, Box<dyn Any>)>,
    ) -> Result<(), GroupError> {
        let mut checked = Vec::new();
        for (name, value) in elements {
            let name = name.into();
            match Element::try_from(value) {
                Ok(element) => checked.push((name, element)),
                Err(_) => return Err(GroupError::TypeMismatch(name)),
            }
        }
        self.append(checked);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Element> {
        self.elements.get(name)
    }

    pub fn waveform(&self, name: &str) -> Option<&Waveform> {
        match self.elements.get(name)? {
            Element::Waveform(w) => Some(w),
            Element::Constant(_) => None,
        }
    }

    pub fn waveform_mut(&mut self, name: &str) -> Option<&mut Waveform> {
        match self.elements.get_mut(name)? {
            Element::Waveform(w) => Some(w),
            Element::Constant(_) => None,
        }
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        match self.elements.get(name)? {
            Element::Constant(c) => Some(c),
            Element::Waveform(_) => None,
        }
    }

    /// Elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Element)> {
        self.elements.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(|n| n.as_str())
    }

    pub fn waveforms(&self) -> impl Iterator<Item = (&str, &Waveform)> {
        self.iter().filter_map(|(n, e)| match e {
            Element::Waveform(w) => Some((n, w)),
            Element::Constant(_) => None,
        })
    }

    pub fn constants(&self) -> impl Iterator<Item = (&str, &Constant)> {
        self.iter().filter_map(|(n, e)| match e {
            Element::Constant(c) => Some((n, c)),
            Element::Waveform(_) => None,
        })
    }

    fn waveforms_mut(&mut self) -> impl Iterator<Item = (&str, &mut Waveform)> {
        self.elements.iter_mut().filter_map(|(n, e)| match e {
            Element::Waveform(w) => Some((n.as_str(), w)),
            Element::Constant(_) => None,
        })
    }

    /// Binds every waveform in the group to the same clock.
    pub fn bind_clock(&mut self, clock: &Clock) {
        for (_, w) in self.waveforms_mut() {
            w.bind_clock(clock.clone());
        }
    }

    /// Advances the read cursor of all waveforms. Constants are not part of the result.
    pub fn read(&mut self, ticks: Tick, reset: bool) -> FxIndexMap<String, ReadResult> {
        self.waveforms_mut()
            .map(|(n, w)| (n.to_string(), w.read(ticks, reset)))
            .collect()
    }

    /// Same as [`SignalGroup::read`] but only returns the current values.
    pub fn read_values(&mut self, ticks: Tick, reset: bool) -> FxIndexMap<String, Option<Value>> {
        self.read(ticks, reset)
            .into_iter()
            .map(|(n, r)| (n, r.value))
            .collect()
    }

    /// Largest last transition tick of all waveforms. `None` if there are no waveforms.
    pub fn max_len(&self) -> Option<Tick> {
        self.waveforms().map(|(_, w)| w.last_tick()).max()
    }

    /// Flattens the group into named arrays: every waveform turns into a `<NAME>_T` array
    /// of transition ticks and a `<NAME>_V` array of values, every constant into `<NAME>`.
    pub fn package_entries(&self) -> Result<Vec<PackageEntry>, GroupError> {
        let mut out = Vec::with_capacity(self.len() * 2);
        for (name, element) in self.iter() {
            let upper = name.to_uppercase();
            match element {
                Element::Waveform(w) => {
                    let ticks = w
                        .transitions()
                        .iter()
                        .map(|(t, _)| {
                            i64::try_from(*t)
                                .map(Value::Int)
                                .map_err(|_| GroupError::TickOutOfRange {
                                    name: name.to_string(),
                                    tick: *t,
                                })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    out.push(PackageEntry {
                        name: format!("{upper}_T"),
                        data: ticks,
                        tpe: Some(ValueType::Integer),
                        width: None,
                    });
                    out.push(PackageEntry {
                        name: format!("{upper}_V"),
                        data: w.transitions().iter().map(|(_, v)| *v).collect(),
                        tpe: w.value_type(),
                        width: w.width(),
                    });
                }
                Element::Constant(c) => out.push(PackageEntry {
                    name: upper,
                    data: vec![c.value()],
                    tpe: c.value_type(),
                    width: c.width(),
                }),
            }
        }
        Ok(out)
    }
}

impl<N: Into<String>, E: Into<Element>> FromIterator<(N, E)> for SignalGroup {
    fn from_iter<T: IntoIterator<Item = (N, E)>>(iter: T) -> Self {
        let mut group = SignalGroup::new();
        group.append(iter);
        group
    }
}

impl Display for SignalGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Group -")?;
        for name in self.names() {
            write!(f, " {name}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(points: &[(Tick, i64)]) -> Waveform {
        Waveform::from_records(
            points.iter().map(|(t, _)| *t),
            points.iter().map(|(_, v)| Value::Int(*v)),
        )
        .unwrap()
    }

    #[test]
    fn test_max_len() {
        let group: SignalGroup = [("a", wave(&[(0, 0), (12, 1)])), ("b", wave(&[(0, 1), (20, 0)]))]
            .into_iter()
            .collect();
        assert_eq!(group.max_len(), Some(20));
        assert_eq!(SignalGroup::new().max_len(), None);
    }

    #[test]
    fn test_insertion_order() {
        let mut group = SignalGroup::new();
        group.append([("z", Element::from(Constant::new(1)))]);
        group.append([("a", Element::from(Waveform::new(0)))]);
        group.append([("m", Element::from(Constant::new(true)))]);
        assert_eq!(group.names().collect::<Vec<_>>(), ["z", "a", "m"]);
        // replacing keeps the position
        group.append([("z", Waveform::new(5))]);
        assert_eq!(group.names().collect::<Vec<_>>(), ["z", "a", "m"]);
        assert!(group.waveform("z").is_some());
        assert_eq!(group.constants().count(), 1);
        assert_eq!(group.to_string(), "Group - z a m");
    }

    #[test]
    fn test_append_any() {
        let mut group = SignalGroup::new();
        group
            .append_any([
                ("w", Box::new(Waveform::new(0)) as Box<dyn Any>),
                ("c", Box::new(Constant::new(3)) as Box<dyn Any>),
            ])
            .unwrap();
        assert_eq!(group.len(), 2);

        let res = group.append_any([
            ("ok", Box::new(Constant::new(1)) as Box<dyn Any>),
            ("bad", Box::new(42u8) as Box<dyn Any>),
        ]);
        assert_eq!(res, Err(GroupError::TypeMismatch("bad".to_string())));
        // nothing was added
        assert_eq!(group.len(), 2);
        assert!(group.get("ok").is_none());
    }

    #[test]
    fn test_read_skips_constants() {
        let mut group: SignalGroup = [
            ("a", Element::from(wave(&[(0, 0), (2, 1)]))),
            ("k", Element::from(Constant::new(7))),
            ("b", Element::from(wave(&[(0, 5), (1, 6)]))),
        ]
        .into_iter()
        .collect();
        let r = group.read(2, false);
        assert_eq!(r.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(r["a"].value, Some(Value::Int(0)));
        assert_eq!(r["b"].transitions, [(0, Value::Int(5)), (1, Value::Int(6))]);

        let values = group.read_values(1, false);
        assert_eq!(values["a"], Some(Value::Int(1)));
        assert_eq!(values["b"], Some(Value::Int(6)));

        let values = group.read_values(1, true);
        assert_eq!(values["a"], Some(Value::Int(0)));
    }

    #[test]
    fn test_bind_clock() {
        let clock = Clock::default();
        let mut group: SignalGroup = [("a", Waveform::new(0)), ("b", Waveform::new(false))]
            .into_iter()
            .collect();
        group.bind_clock(&clock);
        clock.tick(4);
        group.waveform_mut("a").unwrap().append(1, None).unwrap();
        group.waveform_mut("b").unwrap().append(true, None).unwrap();
        assert_eq!(group.max_len(), Some(4));
    }

    #[test]
    fn test_package_entries() {
        let group: SignalGroup = [
            (
                "data",
                Element::from(wave(&[(0, 3), (4, 9)]).with_type(ValueType::Unsigned, Some(4))),
            ),
            (
                "enable",
                Element::from(Constant::new(true).with_type(ValueType::Boolean, None)),
            ),
        ]
        .into_iter()
        .collect();
        let entries = group.package_entries().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["DATA_T", "DATA_V", "ENABLE"]);
        assert_eq!(entries[0].data, [Value::Int(0), Value::Int(4)]);
        assert_eq!(entries[1].data, [Value::Int(3), Value::Int(9)]);
        assert_eq!(entries[1].tpe, Some(ValueType::Unsigned));
        assert_eq!(entries[1].width, Some(4));
        assert_eq!(entries[2].data, [Value::Bool(true)]);
    }

    #[test]
    fn test_package_entries_reject_huge_ticks() {
        let mut w = Waveform::new(0);
        w.append(1, Some(Tick::MAX)).unwrap();
        let group: SignalGroup = [("late", w)].into_iter().collect();
        assert_eq!(
            group.package_entries(),
            Err(GroupError::TickOutOfRange {
                name: "late".to_string(),
                tick: Tick::MAX
            })
        );
    }
}
