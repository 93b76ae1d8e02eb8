// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A manually driven clock for deterministic tests.
//!
//! Every [`Clock`] on a thread reads the same time, which only moves when [`advance`] is
//! called.

use crate::time::{Duration, Timestamp};
use core::cell::Cell;

/// Readings start just past the epoch so that they never equal a zero timestamp
const START: Duration = Duration::from_micros(1);

thread_local! {
    static ELAPSED: Cell<Duration> = const { Cell::new(Duration::ZERO) };
}

/// The current time on this thread
pub fn now() -> Timestamp {
    Timestamp::from_duration(START + ELAPSED.with(Cell::get))
}

/// Moves the time on this thread back to the start
pub fn reset() {
    ELAPSED.with(|elapsed| elapsed.set(Duration::ZERO));
}

pub fn advance(duration: Duration) {
    ELAPSED.with(|elapsed| elapsed.set(elapsed.get() + duration));
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Clock;

impl super::Clock for Clock {
    #[inline]
    fn get_time(&self) -> Timestamp {
        now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Clock as _;

    #[test]
    fn time_moves_only_when_advanced() {
        reset();
        let start = Clock.get_time();
        assert_eq!(Clock.get_time(), start);

        advance(Duration::from_millis(30));
        assert_eq!(now() - start, Duration::from_millis(30));

        reset();
        assert_eq!(now(), start);
    }
}
