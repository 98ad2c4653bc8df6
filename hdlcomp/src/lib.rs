// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

mod clock;
mod group;
mod parse;
mod units;
mod value;
mod waveform;

/// Cargo.toml version of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Discrete unit of simulated time.
pub type Tick = u64;

#[derive(Debug, thiserror::Error)]
pub enum HdlError {
    #[error("failed to parse hierarchy: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    ValueConversion(#[from] ValueConversionError),
    #[error(transparent)]
    Waveform(#[from] WaveformError),
    #[error(transparent)]
    Group(#[from] GroupError),
}

pub type Result<T> = std::result::Result<T, HdlError>;

pub use clock::Clock;
pub use group::{Element, FxIndexMap, GroupError, PackageEntry, SignalGroup};
pub use parse::{
    parse_hierarchy, parse_hierarchy_with_options, parse_imported_units, ImportedUnit,
    LibraryUnitKind, ParseError, ParseOptions,
};
pub use units::{GenerateKind, PortDirection, Unit, UnitKind, UnitRef, UnitTree, UnitTreeBuilder};
pub use value::{Value, ValueConversionError, ValueType};
pub use waveform::{time_value_paths, Constant, ReadResult, Waveform, WaveformError};
