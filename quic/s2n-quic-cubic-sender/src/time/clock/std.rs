// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::*;
use ::std::time::Instant;

/// Monotonic wall clock measuring time since the instant it was started at
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    start: Instant,
}

impl Default for StdClock {
    // the only place the process clock is read
    #[allow(clippy::disallowed_methods)]
    fn default() -> Self {
        Instant::now().into()
    }
}

impl From<Instant> for StdClock {
    #[inline]
    fn from(start: Instant) -> Self {
        Self { start }
    }
}

impl Clock for StdClock {
    #[inline]
    #[allow(clippy::disallowed_methods)]
    fn get_time(&self) -> Timestamp {
        Timestamp::from_duration(self.start.elapsed())
    }
}
