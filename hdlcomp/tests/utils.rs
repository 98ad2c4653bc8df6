// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

#![allow(dead_code)]

use hdlcomp::{UnitTree, Value, Waveform};
use itertools::Itertools;

/// GHDL finishes its output with two lines that are not part of the hierarchy.
pub const EPILOGUE: &str = "simulation finished @0ms\nghdl: done\n";

pub fn init_logger() {
    let _logger = env_logger::builder().is_test(true).try_init();
}

/// Every unit below the top is listed exactly once by its parent.
pub fn assert_consistent(tree: &UnitTree) {
    let mut count = 0;
    for unit in tree.iter() {
        count += 1;
        let parent = tree[unit].parent().expect("only the top has no parent");
        let occurrences = tree[parent].children().iter().filter(|c| **c == unit).count();
        assert_eq!(occurrences, 1, "{}", tree.full_name(unit));
    }
    // everything except the top is reachable
    assert_eq!(count, tree.len() - 1);
    assert_eq!(tree[tree.top()].parent(), None);
    assert_eq!(tree[tree.top()].children(), [tree.entity()]);
}

/// No two consecutive transitions carry the same value and ticks strictly increase.
pub fn assert_compact(w: &Waveform) {
    for ((t0, v0), (t1, v1)) in w.transitions().iter().tuple_windows() {
        assert!(t0 < t1, "{t0} >= {t1}");
        assert_ne!(v0, v1, "repeated value at {t0} and {t1}");
    }
}

/// Reference model: value at `tick` by linear search.
pub fn value_at(w: &Waveform, tick: u64) -> Option<Value> {
    w.transitions()
        .iter()
        .take_while(|(t, _)| *t <= tick)
        .last()
        .map(|(_, v)| *v)
}
