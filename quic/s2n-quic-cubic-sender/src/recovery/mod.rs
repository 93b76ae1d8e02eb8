// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub use bandwidth::Bandwidth;
pub use config::{Config, Mode, ValidationError};
pub use congestion_window::CongestionWindowController;
pub use cubic::{Cubic, WindowGrowthModel};
pub use hybrid_slow_start::HybridSlowStart;
pub use prr::{Prr, RecoveryPacer};
pub use rtt_estimator::*;
pub use stats::Stats;

pub mod bandwidth;
pub mod config;
pub mod congestion_window;
pub mod cubic;
pub mod hybrid_slow_start;
pub mod prr;
mod rtt_estimator;
mod stats;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Packet numbers start at 1; zero is reserved to mean "no packet"
pub type PacketNumber = u64;

/// The segment size used for every conversion between packet counts and byte counts
pub const MAX_SEGMENT_SIZE: u64 = 1460;

/// The minimum window used for reductions on a fast retransmission, from RFC 3782 (NewReno).
/// The window after a retransmission timeout is also driven to this floor rather than to 1.
pub const DEFAULT_MIN_CONGESTION_WINDOW: u64 = 2;

/// The default window, in packets, for a new connection
pub const DEFAULT_INITIAL_CONGESTION_WINDOW: u64 = 32;

/// The absolute upper bound of the congestion window, in packets
pub const MAX_CONGESTION_WINDOW: u64 = 2000;

/// The floor applied when the window is restored from a cached bandwidth estimate
pub const MIN_CONGESTION_WINDOW_FOR_BANDWIDTH_RESUMPTION: u64 = 10;

/// The number of parallel TCP flows a connection emulates by default
pub const DEFAULT_NUM_CONNECTIONS: u32 = 2;

/// Sender-side CUBIC with a Reno compatibility mode, counting the window in packets.
#[cfg(feature = "std")]
pub type TcpCubicSender = CongestionWindowController<Cubic<crate::time::StdClock>>;
