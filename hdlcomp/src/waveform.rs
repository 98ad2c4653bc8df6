// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::{Clock, Tick, Value, ValueConversionError, ValueType};
use std::fmt::{Debug, Formatter};
use std::io::BufRead;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum WaveformError {
    #[error("cannot append at tick {tick}, the waveform already ends at tick {last}")]
    NonMonotonicTick { tick: Tick, last: Tick },
    #[error("got {ticks} ticks but {values} values")]
    LengthMismatch { ticks: usize, values: usize },
    #[error("a waveform needs at least one transition")]
    EmptyRecords,
    #[error("failed to parse tick `{text}` in line {line}")]
    InvalidTick { line: usize, text: String },
    #[error("failed to decode value")]
    ValueConversion(#[from] ValueConversionError),
    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result of advancing the read cursor of a [`Waveform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    /// Value at `tick`, `None` if nothing was observed yet
    /// or the trace had not started at that tick.
    pub value: Option<Value>,
    /// Transitions that happened inside the observed window.
    pub transitions: Vec<(Tick, Value)>,
    /// Last observed tick. The next read continues right after it.
    pub tick: Option<Tick>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
struct ReadCursor {
    /// first tick that has not been observed yet
    position: Tick,
    last_tick: Option<Tick>,
    last_value: Option<Value>,
}

/// Value of a single signal over time.
///
/// Only value changes are stored: no two consecutive transitions carry the same value.
#[derive(Clone)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Waveform {
    transitions: Vec<(Tick, Value)>,
    tpe: Option<ValueType>,
    width: Option<u32>,
    #[cfg_attr(feature = "serde1", serde(skip))]
    clock: Option<Clock>,
    cursor: ReadCursor,
}

impl Debug for Waveform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Waveform({} transitions, last value {}, {:?})",
            self.transitions.len(),
            self.last_value(),
            self.tpe
        )
    }
}

impl Waveform {
    /// Creates a waveform that starts with `initial` at tick 0.
    pub fn new(initial: impl Into<Value>) -> Self {
        Self {
            transitions: vec![(0, initial.into())],
            tpe: None,
            width: None,
            clock: None,
            cursor: ReadCursor::default(),
        }
    }

    /// Reconstructs a waveform from paired sequences of ticks and values.
    /// Repeated values are dropped so that only actual changes remain.
    pub fn from_records(
        ticks: impl IntoIterator<Item = Tick>,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Self, WaveformError> {
        let ticks: Vec<Tick> = ticks.into_iter().collect();
        let values: Vec<Value> = values.into_iter().collect();
        if ticks.len() != values.len() {
            return Err(WaveformError::LengthMismatch {
                ticks: ticks.len(),
                values: values.len(),
            });
        }
        let mut pairs = ticks.into_iter().zip(values);
        let (first_tick, first_value) = pairs.next().ok_or(WaveformError::EmptyRecords)?;
        let mut transitions = vec![(first_tick, first_value)];
        // dropped repetitions still count for the ordering check
        let mut prev_tick = first_tick;
        for (tick, value) in pairs {
            if tick <= prev_tick {
                return Err(WaveformError::NonMonotonicTick {
                    tick,
                    last: prev_tick,
                });
            }
            prev_tick = tick;
            if value != transitions[transitions.len() - 1].1 {
                transitions.push((tick, value));
            }
        }
        log::trace!("loaded waveform with {} transitions", transitions.len());
        Ok(Self {
            transitions,
            tpe: None,
            width: None,
            clock: None,
            cursor: ReadCursor::default(),
        })
    }

    /// Loads a trace from a pair of line oriented records: one decimal tick per line and
    /// one bit string per line which is decoded as `tpe`.
    pub fn from_time_value_readers(
        times: impl BufRead,
        values: impl BufRead,
        tpe: ValueType,
        width: Option<u32>,
    ) -> Result<Self, WaveformError> {
        let mut ticks = Vec::new();
        for (ii, line) in times.lines().enumerate() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let tick = text.parse::<Tick>().map_err(|_| WaveformError::InvalidTick {
                line: ii + 1,
                text: text.to_string(),
            })?;
            ticks.push(tick);
        }
        let mut decoded = Vec::with_capacity(ticks.len());
        for line in values.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            decoded.push(tpe.decode(&line)?);
        }
        Ok(Self::from_records(ticks, decoded)?.with_type(tpe, width))
    }

    /// Loads a trace from a `(times, values)` file pair, see [`time_value_paths`].
    pub fn from_time_value_files(
        times: impl AsRef<Path>,
        values: impl AsRef<Path>,
        tpe: ValueType,
        width: Option<u32>,
    ) -> Result<Self, WaveformError> {
        let times = std::io::BufReader::new(std::fs::File::open(times)?);
        let values = std::io::BufReader::new(std::fs::File::open(values)?);
        Self::from_time_value_readers(times, values, tpe, width)
    }

    pub fn with_type(mut self, tpe: ValueType, width: Option<u32>) -> Self {
        self.tpe = Some(tpe);
        self.width = width;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn bind_clock(&mut self, clock: Clock) {
        self.clock = Some(clock);
    }

    pub fn clock(&self) -> Option<&Clock> {
        self.clock.as_ref()
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.tpe
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn transitions(&self) -> &[(Tick, Value)] {
        &self.transitions
    }

    #[inline]
    pub fn last_tick(&self) -> Tick {
        self.last().0
    }

    #[inline]
    pub fn last_value(&self) -> Value {
        self.last().1
    }

    #[inline]
    fn last(&self) -> (Tick, Value) {
        // there is always at least one transition
        self.transitions[self.transitions.len() - 1]
    }

    /// Records `value` at `tick`.
    ///
    /// Without an explicit tick, the bound clock decides. Without a clock, the value is
    /// appended one tick after the last transition. An explicit tick moves a bound clock,
    /// unless the append is rejected.
    pub fn append(&mut self, value: impl Into<Value>, tick: Option<Tick>) -> Result<(), WaveformError> {
        let value = value.into();
        let explicit = tick.is_some();
        let tick = match (tick, &self.clock) {
            (Some(tick), _) => tick,
            (None, Some(clock)) => clock.now(),
            (None, None) => self.last_tick().saturating_add(1),
        };
        let (last_tick, last_value) = self.last();
        if tick < last_tick {
            return Err(WaveformError::NonMonotonicTick {
                tick,
                last: last_tick,
            });
        }
        if let (true, Some(clock)) = (explicit, &self.clock) {
            clock.set_now(tick);
        }
        if tick == last_tick {
            // last write wins
            let len = self.transitions.len();
            if len > 1 && self.transitions[len - 2].1 == value {
                self.transitions.pop();
            } else {
                self.transitions[len - 1].1 = value;
            }
        } else if value != last_value {
            self.transitions.push((tick, value));
        }
        log::trace!("append {value} @ {tick}");
        Ok(())
    }

    /// Value at `tick`, or the last value if no tick is given.
    /// Returns `None` if the waveform only starts after `tick`.
    pub fn get_value(&self, tick: Option<Tick>) -> Option<Value> {
        match tick {
            None => Some(self.last_value()),
            Some(tick) => {
                let idx = self.transitions.partition_point(|(t, _)| *t <= tick);
                if idx == 0 {
                    None
                } else {
                    Some(self.transitions[idx - 1].1)
                }
            }
        }
    }

    /// Observes the next `ticks` ticks, starting at the current cursor position
    /// (or at tick zero when `reset` is set). The window ends at `Tick::MAX`.
    pub fn read(&mut self, ticks: Tick, reset: bool) -> ReadResult {
        if reset {
            self.cursor = ReadCursor::default();
        }
        let start = self.cursor.position;
        let end = start.saturating_add(ticks);
        let mut transitions = Vec::new();
        if end > start {
            let lo = self.transitions.partition_point(|(t, _)| *t < start);
            let hi = self.transitions.partition_point(|(t, _)| *t < end);
            transitions.extend_from_slice(&self.transitions[lo..hi]);
            self.cursor.last_tick = Some(end - 1);
            self.cursor.last_value = self.get_value(Some(end - 1));
            self.cursor.position = end;
        }
        ReadResult {
            value: self.cursor.last_value,
            transitions,
            tick: self.cursor.last_tick,
        }
    }

    /// Value seen by the most recent [`Waveform::read`].
    pub fn current_value(&self) -> Option<Value> {
        self.cursor.last_value
    }

    /// Run length encoding of the waveform: `(value, duration)` pairs where the final
    /// value lasts until `end` (exclusive, but always at least one tick).
    pub fn durations(&self, end: Tick) -> Vec<(Value, Tick)> {
        let end = end.max(self.last_tick().saturating_add(1));
        let next_ticks = self.transitions.iter().skip(1).map(|(t, _)| *t).chain([end]);
        self.transitions
            .iter()
            .zip(next_ticks)
            .map(|((tick, value), next)| (*value, next - tick))
            .collect()
    }
}

/// Typical file names for a signal dumped by a testbench as a pair of
/// tick and value files: `<dir>/<name>_t.out` and `<dir>/<name>_v.out`.
pub fn time_value_paths(name: &str, dir: impl AsRef<Path>) -> (PathBuf, PathBuf) {
    let dir = dir.as_ref();
    (
        dir.join(format!("{name}_t.out")),
        dir.join(format!("{name}_v.out")),
    )
}

/// A value without a time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Constant {
    value: Value,
    tpe: Option<ValueType>,
    width: Option<u32>,
}

impl Constant {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            tpe: None,
            width: None,
        }
    }

    pub fn with_type(mut self, tpe: ValueType, width: Option<u32>) -> Self {
        self.tpe = Some(tpe);
        self.width = width;
        self
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.tpe
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }
}
