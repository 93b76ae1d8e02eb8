// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::recovery::{
    DEFAULT_INITIAL_CONGESTION_WINDOW, DEFAULT_MIN_CONGESTION_WINDOW, DEFAULT_NUM_CONNECTIONS,
    MAX_CONGESTION_WINDOW,
};

/// The growth law applied in congestion avoidance and on loss.
///
/// A connection never changes mode once its controller is created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "generator"), derive(bolero_generator::TypeGenerator))]
pub enum Mode {
    /// Classic TCP Reno: one packet per round trip, multiplicative decrease by the Reno beta
    Reno,
    /// Window growth follows the CUBIC curve of the configured growth model
    #[default]
    Cubic,
}

impl Mode {
    #[inline]
    pub fn is_reno(self) -> bool {
        matches!(self, Self::Reno)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ValidationError(&'static str);

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ValidationError {}

/// Construction-time settings of a [`CongestionWindowController`].
///
/// All window sizes are in packets.
///
/// [`CongestionWindowController`]: super::CongestionWindowController
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub(crate) mode: Mode,
    pub(crate) initial_congestion_window: u64,
    pub(crate) max_congestion_window: u64,
    pub(crate) min_congestion_window: u64,
    pub(crate) num_connections: u32,
    pub(crate) slow_start_large_reduction: bool,
    pub(crate) byte_conservation: bool,
    pub(crate) hybrid_slow_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! setter {
    ($name:ident, $field:ident, $inner:ty, $check:expr, $reason:literal) => {
        pub fn $name(mut self, value: $inner) -> Result<Self, ValidationError> {
            let check: fn($inner) -> bool = $check;
            if !check(value) {
                return Err(ValidationError($reason));
            }
            self.$field = value;
            Ok(self)
        }
    };
}

impl Config {
    pub const fn new() -> Self {
        Self {
            mode: Mode::Cubic,
            initial_congestion_window: DEFAULT_INITIAL_CONGESTION_WINDOW,
            max_congestion_window: MAX_CONGESTION_WINDOW,
            min_congestion_window: DEFAULT_MIN_CONGESTION_WINDOW,
            num_connections: DEFAULT_NUM_CONNECTIONS,
            slow_start_large_reduction: false,
            byte_conservation: true,
            hybrid_slow_start: true,
        }
    }

    /// Default settings using Reno growth
    pub const fn reno() -> Self {
        let mut config = Self::new();
        config.mode = Mode::Reno;
        config
    }

    /// Default settings using CUBIC growth
    pub const fn cubic() -> Self {
        Self::new()
    }

    pub const fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    setter!(
        with_initial_congestion_window,
        initial_congestion_window,
        u64,
        |packets| packets > 0,
        "initial congestion window must be at least 1 packet"
    );
    setter!(
        with_max_congestion_window,
        max_congestion_window,
        u64,
        |packets| packets > 0,
        "max congestion window must be at least 1 packet"
    );
    setter!(
        with_min_congestion_window,
        min_congestion_window,
        u64,
        |packets| packets > 0,
        "min congestion window must be at least 1 packet"
    );
    setter!(
        with_num_connections,
        num_connections,
        u32,
        |count| count > 0,
        "at least one connection must be emulated"
    );

    /// Reduces the window by one packet per lost packet while in slow start,
    /// instead of applying a single multiplicative decrease per loss event
    pub const fn with_slow_start_large_reduction(mut self, enabled: bool) -> Self {
        self.slow_start_large_reduction = enabled;
        self
    }

    /// With slow start large reduction, charges later losses from the same loss event
    /// one packet per segment of lost bytes rather than one packet per lost packet
    pub const fn with_byte_conservation(mut self, enabled: bool) -> Self {
        self.byte_conservation = enabled;
        self
    }

    /// Leaves slow start early when round trip times show queues building up
    pub const fn with_hybrid_slow_start(mut self, enabled: bool) -> Self {
        self.hybrid_slow_start = enabled;
        self
    }

    /// Checks the relations between the individual settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_congestion_window > self.initial_congestion_window {
            return Err(ValidationError(
                "min congestion window exceeds the initial congestion window",
            ));
        }

        if self.initial_congestion_window > self.max_congestion_window {
            return Err(ValidationError(
                "initial congestion window exceeds the max congestion window",
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn initial_congestion_window(&self) -> u64 {
        self.initial_congestion_window
    }

    #[inline]
    pub fn max_congestion_window(&self) -> u64 {
        self.max_congestion_window
    }

    #[inline]
    pub fn min_congestion_window(&self) -> u64 {
        self.min_congestion_window
    }

    #[inline]
    pub fn num_connections(&self) -> u32 {
        self.num_connections
    }

    #[inline]
    pub fn hybrid_slow_start(&self) -> bool {
        self.hybrid_slow_start
    }
}
