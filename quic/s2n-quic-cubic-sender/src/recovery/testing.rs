// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::recovery::{RecoveryPacer, RttProvider, WindowGrowthModel};
use core::time::Duration;

/// A growth model that records every call and returns scripted windows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockGrowthModel {
    pub on_application_limited: u32,
    pub after_ack: u32,
    pub after_loss: u32,
    pub reset: u32,
    pub num_connections: u32,
    /// The min RTT received by the last `congestion_window_after_ack` call
    pub last_min_rtt: Option<Duration>,
    /// Returned by `congestion_window_after_ack`; defaults to one more than the current window
    pub next_window_after_ack: Option<u64>,
    /// Returned by `congestion_window_after_packet_loss`; defaults to half the current window
    pub next_window_after_loss: Option<u64>,
}

impl WindowGrowthModel for MockGrowthModel {
    fn on_application_limited(&mut self) {
        self.on_application_limited += 1;
    }

    fn congestion_window_after_ack(
        &mut self,
        current_congestion_window: u64,
        min_rtt: Duration,
    ) -> u64 {
        self.after_ack += 1;
        self.last_min_rtt = Some(min_rtt);
        self.next_window_after_ack
            .unwrap_or(current_congestion_window + 1)
    }

    fn congestion_window_after_packet_loss(&mut self, current_congestion_window: u64) -> u64 {
        self.after_loss += 1;
        self.next_window_after_loss
            .unwrap_or(current_congestion_window / 2)
    }

    fn reset(&mut self) {
        self.reset += 1;
    }

    fn set_num_connections(&mut self, num_connections: u32) {
        self.num_connections = num_connections;
    }
}

/// A recovery pacer that records the bytes in flight of every loss notification
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockPacer {
    pub losses: Vec<u64>,
}

impl RecoveryPacer for MockPacer {
    fn on_packet_lost(&mut self, bytes_in_flight: u64) {
        self.losses.push(bytes_in_flight);
    }
}

/// An RTT provider with a fixed minimum RTT
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstantRtt(pub Duration);

impl Default for ConstantRtt {
    fn default() -> Self {
        Self(Duration::from_millis(100))
    }
}

impl RttProvider for ConstantRtt {
    fn min_rtt(&self) -> Duration {
        self.0
    }
}
