// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::Tick;
use std::cell::Cell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Shared tick counter.
///
/// Cloning a `Clock` yields another handle to the *same* counter. This lets several
/// [`crate::Waveform`]s advance in lock step when they are written from a single loop:
///
/// ```
/// use hdlcomp::{Clock, Value, Waveform};
/// let clock = Clock::default();
/// let mut a = Waveform::new(false).with_clock(clock.clone());
/// let mut b = Waveform::new(0).with_clock(clock.clone());
/// clock.tick(1);
/// a.append(true, None).unwrap();
/// b.append(3, None).unwrap();
/// assert_eq!(a.last_tick(), 1);
/// assert_eq!(b.get_value(Some(1)), Some(Value::Int(3)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Clock {
    now: Rc<Cell<Tick>>,
}

impl Clock {
    pub fn new(initial: Tick) -> Self {
        Self {
            now: Rc::new(Cell::new(initial)),
        }
    }

    /// Advances the counter by `increment` and returns the new tick.
    /// The counter stops at `Tick::MAX`.
    pub fn tick(&self, increment: Tick) -> Tick {
        let next = self.now.get().saturating_add(increment);
        self.now.set(next);
        next
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.now.get()
    }

    /// Jumps to an arbitrary tick, e.g., to follow an externally observed simulation time.
    #[inline]
    pub fn set_now(&self, tick: Tick) {
        self.now.set(tick);
    }

    /// Returns true iff both handles refer to the same counter.
    pub fn shares_counter_with(&self, other: &Clock) -> bool {
        Rc::ptr_eq(&self.now, &other.now)
    }
}

impl Display for Clock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Clock at tick {}", self.now())
    }
}
