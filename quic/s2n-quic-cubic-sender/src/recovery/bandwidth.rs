// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;

const MICRO_BITS_PER_BYTE: u64 = 8 * 1_000_000;

/// A data rate, as carried in a cached network parameters hint
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bandwidth {
    bits_per_second: u64,
}

impl Bandwidth {
    pub const ZERO: Bandwidth = Bandwidth { bits_per_second: 0 };

    pub const MAX: Bandwidth = Bandwidth {
        bits_per_second: u64::MAX,
    };

    /// Constructs the rate at which `bytes` are delivered over `interval`
    pub fn new(bytes: u64, interval: Duration) -> Self {
        if interval.is_zero() {
            Bandwidth::ZERO
        } else {
            let bits_per_second =
                bytes as u128 * MICRO_BITS_PER_BYTE as u128 / interval.as_micros();
            Self {
                bits_per_second: bits_per_second.min(u64::MAX as u128) as u64,
            }
        }
    }

    pub const fn from_bits_per_second(bits_per_second: u64) -> Self {
        Self { bits_per_second }
    }

    pub const fn from_bytes_per_second(bytes_per_second: u64) -> Self {
        Self {
            bits_per_second: bytes_per_second.saturating_mul(8),
        }
    }

    #[inline]
    pub const fn bits_per_second(&self) -> u64 {
        self.bits_per_second
    }

    /// Returns the number of bytes delivered at this rate over `period`
    #[inline]
    pub fn bytes_per_period(&self, period: Duration) -> u64 {
        let bytes = (self.bits_per_second as u128).saturating_mul(period.as_micros())
            / MICRO_BITS_PER_BYTE as u128;
        bytes.min(u64::MAX as u128) as u64
    }
}
