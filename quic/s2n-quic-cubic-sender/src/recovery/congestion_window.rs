// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    recovery::{
        Bandwidth, Config, HybridSlowStart, Mode, PacketNumber, RecoveryPacer, RttProvider, Stats,
        ValidationError, WindowGrowthModel, MAX_CONGESTION_WINDOW, MAX_SEGMENT_SIZE,
        MIN_CONGESTION_WINDOW_FOR_BANDWIDTH_RESUMPTION,
    },
    trace,
};
use core::time::Duration;
use num_rational::Ratio;

#[cfg(test)]
mod fuzz_target;

/// Reno backoff factor for a single connection
const RENO_BETA: Ratio<u64> = Ratio::new_raw(7, 10);

/// The window is still considered in use while no more than this many packets
/// could be sent at once
const MAX_BURST_PACKETS: u64 = 3;

/// A congestion window controller counted in packets, implementing TCP Reno and CUBIC.
///
/// The controller assumes every event for a connection is delivered in the order it was
/// detected. Losses of packets sent before the last cutback belong to the loss event that
/// caused it ([RFC 6582](https://www.rfc-editor.org/rfc/rfc6582)) and do not reduce the
/// window again.
#[derive(Clone, Debug)]
pub struct CongestionWindowController<G: WindowGrowthModel> {
    growth: G,
    mode: Mode,
    stats: Stats,
    /// Packets permitted in flight
    congestion_window: u64,
    /// Slow start continues while the window is below this threshold
    slowstart_threshold: u64,
    min_congestion_window: u64,
    max_congestion_window: u64,
    /// Acknowledgements since the last Reno increase in congestion avoidance
    congestion_window_count: u64,
    /// Emulated parallel connections, for fairness against TCP
    num_connections: u32,
    largest_sent_packet_number: PacketNumber,
    largest_acked_packet_number: PacketNumber,
    largest_sent_at_last_cutback: PacketNumber,
    /// Whether the last cutback happened while in slow start
    last_cutback_exited_slowstart: bool,
    slow_start_large_reduction: bool,
    byte_conservation: bool,
    /// `None` when delay-based slow start exit is disabled
    hybrid_slow_start: Option<HybridSlowStart>,
    initial_congestion_window: u64,
    initial_max_congestion_window: u64,
}

impl<G: WindowGrowthModel> CongestionWindowController<G> {
    pub fn new(config: Config, mut growth: G) -> Result<Self, ValidationError> {
        config.validate()?;
        growth.set_num_connections(config.num_connections);

        Ok(Self {
            growth,
            mode: config.mode,
            stats: Stats::default(),
            congestion_window: config.initial_congestion_window,
            slowstart_threshold: config.max_congestion_window,
            min_congestion_window: config.min_congestion_window,
            max_congestion_window: config.max_congestion_window,
            congestion_window_count: 0,
            num_connections: config.num_connections,
            largest_sent_packet_number: 0,
            largest_acked_packet_number: 0,
            largest_sent_at_last_cutback: 0,
            last_cutback_exited_slowstart: false,
            slow_start_large_reduction: config.slow_start_large_reduction,
            byte_conservation: config.byte_conservation,
            hybrid_slow_start: config
                .hybrid_slow_start
                .then(HybridSlowStart::new),
            initial_congestion_window: config.initial_congestion_window,
            initial_max_congestion_window: config.max_congestion_window,
        })
    }

    /// Records a sent packet. Returns `false` if the packet is not congestion controlled.
    pub fn on_packet_sent(
        &mut self,
        packet_number: PacketNumber,
        is_retransmittable: bool,
    ) -> bool {
        if self.in_slow_start() {
            self.stats.slowstart_packets_sent += 1;
        }

        if !is_retransmittable {
            return false;
        }

        debug_assert!(
            self.largest_sent_packet_number < packet_number,
            "packet numbers must be sent in increasing order"
        );
        self.largest_sent_packet_number = packet_number;
        if let Some(hybrid_slow_start) = self.hybrid_slow_start.as_mut() {
            hybrid_slow_start.on_packet_sent(packet_number);
        }
        true
    }

    /// Called for each newly acknowledged packet
    pub fn on_packet_acked<R: RttProvider>(
        &mut self,
        acked_packet_number: PacketNumber,
        bytes_in_flight: u64,
        rtt: &R,
    ) {
        self.largest_acked_packet_number =
            self.largest_acked_packet_number.max(acked_packet_number);

        if self.in_recovery() {
            // The recovery pacer governs sending until the episode ends
            return;
        }

        self.maybe_increase_window(acked_packet_number, bytes_in_flight, rtt);

        if self.in_slow_start() {
            if let Some(hybrid_slow_start) = self.hybrid_slow_start.as_mut() {
                hybrid_slow_start.on_packet_acked(acked_packet_number);
            }
        }
    }

    /// Called after the RTT estimate took a new sample. Leaves slow start once the
    /// samples of a round show the delay rising above the minimum RTT.
    pub fn on_rtt_updated<R: RttProvider>(&mut self, latest_rtt: Duration, rtt: &R) {
        if !self.in_slow_start() {
            return;
        }

        let congestion_window = self.congestion_window;
        let Some(hybrid_slow_start) = self.hybrid_slow_start.as_mut() else {
            return;
        };

        if hybrid_slow_start.should_exit_slow_start(latest_rtt, rtt.min_rtt(), congestion_window)
        {
            self.exit_slow_start();
            trace::debug!(
                congestion_window = self.congestion_window,
                ?latest_rtt,
                "hybrid slow start exit"
            );
        }
    }

    /// Called for each newly lost packet
    pub fn on_packet_lost<P: RecoveryPacer>(
        &mut self,
        packet_number: PacketNumber,
        lost_bytes: u64,
        bytes_in_flight: u64,
        pacer: &mut P,
    ) {
        // TCP NewReno (RFC 6582) treats any loss of a packet sent before the last cutback
        // as part of the same loss event
        if packet_number <= self.largest_sent_at_last_cutback {
            if self.last_cutback_exited_slowstart {
                self.on_slow_start_loss_after_cutback(lost_bytes);
            }
            trace::debug!(
                packet_number,
                largest_sent_at_last_cutback = self.largest_sent_at_last_cutback,
                "ignoring loss of a packet sent before the last cutback"
            );
            return;
        }

        self.stats.loss_events += 1;
        let in_slow_start = self.in_slow_start();
        self.last_cutback_exited_slowstart = in_slow_start;
        if in_slow_start {
            self.stats.slowstart_packets_lost += 1;
        }

        pacer.on_packet_lost(bytes_in_flight);

        self.congestion_window = if self.slow_start_large_reduction && in_slow_start {
            debug_assert!(
                self.congestion_window > 1,
                "the congestion window must exceed one packet to be decremented"
            );
            self.congestion_window.saturating_sub(1)
        } else if self.mode.is_reno() {
            (Ratio::from_integer(self.congestion_window) * self.reno_beta()).to_integer()
        } else {
            self.growth.congestion_window_after_packet_loss(self.congestion_window)
        };

        self.congestion_window = self.congestion_window.max(self.min_congestion_window);
        // slow start resumes only once growth earns it
        self.slowstart_threshold = self.congestion_window;
        self.largest_sent_at_last_cutback = self.largest_sent_packet_number;
        // Reno growth starts counting again once recovery ends
        self.congestion_window_count = 0;

        trace::debug!(
            congestion_window = self.congestion_window,
            slowstart_threshold = self.slowstart_threshold,
            "loss cutback"
        );
    }

    /// Charges a loss from an earlier slow start loss event to the slow start counters
    fn on_slow_start_loss_after_cutback(&mut self, lost_bytes: u64) {
        self.stats.slowstart_packets_lost += 1;
        self.stats.slowstart_bytes_lost += lost_bytes;

        if !self.slow_start_large_reduction {
            return;
        }

        let should_reduce = if self.byte_conservation {
            // reduce by one packet for every segment of bytes lost
            let bytes_lost = self.stats.slowstart_bytes_lost;
            self.stats.slowstart_packets_lost == 1
                || bytes_lost / MAX_SEGMENT_SIZE > (bytes_lost - lost_bytes) / MAX_SEGMENT_SIZE
        } else {
            // reduce by one packet for every loss
            true
        };

        if should_reduce {
            self.congestion_window = self
                .congestion_window
                .saturating_sub(1)
                .max(self.min_congestion_window);
        }
        self.slowstart_threshold = self.congestion_window;
    }

    /// Grows the window for an acknowledgement received outside of recovery.
    ///
    /// QUIC acknowledges every packet individually, unlike the cumulative acknowledgements of
    /// TCP, so slow start grows by exactly one packet per call.
    pub fn maybe_increase_window<R: RttProvider>(
        &mut self,
        acked_packet_number: PacketNumber,
        bytes_in_flight: u64,
        rtt: &R,
    ) {
        debug_assert!(
            !self.in_recovery(),
            "the congestion window must not grow during recovery"
        );
        debug_assert!(
            acked_packet_number <= self.largest_sent_packet_number,
            "only sent packets can be acknowledged"
        );

        // Only grow while the sender is close to using the current window
        if !self.is_cwnd_limited(bytes_in_flight) {
            self.growth.on_application_limited();
            return;
        }

        if self.congestion_window >= self.max_congestion_window {
            return;
        }

        if self.in_slow_start() {
            self.congestion_window += 1;
            trace::debug!(
                acked_packet_number,
                congestion_window = self.congestion_window,
                slowstart_threshold = self.slowstart_threshold,
                "slow start"
            );
            return;
        }

        match self.mode {
            Mode::Reno => {
                self.congestion_window_count += 1;
                // Scaling by the emulated connections grows faster than a single Reno flow
                if self.congestion_window_count * self.num_connections as u64
                    >= self.congestion_window
                {
                    self.congestion_window += 1;
                    self.congestion_window_count = 0;
                }

                trace::debug!(
                    acked_packet_number,
                    congestion_window = self.congestion_window,
                    slowstart_threshold = self.slowstart_threshold,
                    congestion_window_count = self.congestion_window_count,
                    "reno"
                );
            }
            Mode::Cubic => {
                let target = self
                    .growth
                    .congestion_window_after_ack(self.congestion_window, rtt.min_rtt());
                self.congestion_window = target.min(self.max_congestion_window);

                trace::debug!(
                    acked_packet_number,
                    congestion_window = self.congestion_window,
                    slowstart_threshold = self.slowstart_threshold,
                    "cubic"
                );
            }
        }
    }

    /// Called when the retransmission timer fires. `packets_retransmitted` is false when the
    /// timeout did not retransmit anything, in which case the window is left untouched.
    pub fn on_retransmission_timeout(&mut self, packets_retransmitted: bool) {
        self.largest_sent_at_last_cutback = 0;
        if !packets_retransmitted {
            return;
        }
        if let Some(hybrid_slow_start) = self.hybrid_slow_start.as_mut() {
            hybrid_slow_start.restart();
        }
        self.handle_retransmission_timeout();
    }

    /// Collapses the window to the minimum after a retransmission timeout
    pub fn handle_retransmission_timeout(&mut self) {
        self.growth.reset();
        self.slowstart_threshold = self.congestion_window / 2;
        self.congestion_window = self.min_congestion_window;

        trace::debug!(
            congestion_window = self.congestion_window,
            slowstart_threshold = self.slowstart_threshold,
            "retransmission timeout"
        );
    }

    /// Restores the construction-time window after the connection moved to a new path
    pub fn on_connection_migration(&mut self) {
        self.largest_sent_packet_number = 0;
        self.largest_acked_packet_number = 0;
        self.largest_sent_at_last_cutback = 0;
        self.last_cutback_exited_slowstart = false;
        // rounds are tracked by packet number, which restarts on the new path
        if let Some(hybrid_slow_start) = self.hybrid_slow_start.as_mut() {
            *hybrid_slow_start = HybridSlowStart::new();
        }

        self.growth.reset();
        self.congestion_window_count = 0;
        self.congestion_window = self.initial_congestion_window;
        self.slowstart_threshold = self.initial_max_congestion_window;
        self.max_congestion_window = self.initial_max_congestion_window;

        trace::debug!(
            congestion_window = self.congestion_window,
            "connection migration"
        );
    }

    /// Sets the window from a cached bandwidth and round trip time estimate.
    ///
    /// The estimate originates from the peer, so the result is clamped rather than trusted.
    pub fn set_congestion_window_from_bandwidth_and_rtt(
        &mut self,
        bandwidth: Bandwidth,
        rtt: Duration,
    ) {
        let congestion_window = bandwidth.bytes_per_period(rtt) / MAX_SEGMENT_SIZE;
        self.congestion_window = congestion_window
            .min(MAX_CONGESTION_WINDOW)
            .max(MIN_CONGESTION_WINDOW_FOR_BANDWIDTH_RESUMPTION);
    }

    #[inline]
    pub fn set_congestion_window_in_packets(&mut self, congestion_window: u64) {
        self.congestion_window = congestion_window;
    }

    #[inline]
    pub fn set_min_congestion_window_in_packets(&mut self, congestion_window: u64) {
        self.min_congestion_window = congestion_window;
    }

    pub fn set_num_emulated_connections(&mut self, num_connections: u32) {
        self.num_connections = num_connections.max(1);
        self.growth.set_num_connections(self.num_connections);
    }

    /// Sets the maximum window from a byte count
    #[inline]
    pub fn set_max_congestion_window(&mut self, max_congestion_window: u64) {
        self.max_congestion_window = max_congestion_window / MAX_SEGMENT_SIZE;
    }

    /// Leaves slow start at the current window
    #[inline]
    pub fn exit_slow_start(&mut self) {
        self.slowstart_threshold = self.congestion_window;
    }

    /// The congestion window in bytes
    #[inline]
    pub fn congestion_window(&self) -> u64 {
        self.congestion_window * MAX_SEGMENT_SIZE
    }

    /// The slow start threshold in bytes
    #[inline]
    pub fn slow_start_threshold(&self) -> u64 {
        self.slowstart_threshold * MAX_SEGMENT_SIZE
    }

    #[inline]
    pub fn congestion_window_packets(&self) -> u64 {
        self.congestion_window
    }

    #[inline]
    pub fn slow_start_threshold_packets(&self) -> u64 {
        self.slowstart_threshold
    }

    #[inline]
    pub fn min_congestion_window_packets(&self) -> u64 {
        self.min_congestion_window
    }

    #[inline]
    pub fn max_congestion_window_packets(&self) -> u64 {
        self.max_congestion_window
    }

    #[inline]
    pub fn largest_sent_at_last_cutback(&self) -> PacketNumber {
        self.largest_sent_at_last_cutback
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn num_connections(&self) -> u32 {
        self.num_connections
    }

    #[inline]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    #[inline]
    pub fn growth_model(&self) -> &G {
        &self.growth
    }

    #[inline]
    pub fn in_slow_start(&self) -> bool {
        self.congestion_window < self.slowstart_threshold
    }

    /// A recovery episode lasts until a packet sent after the last cutback is acknowledged
    #[inline]
    pub fn in_recovery(&self) -> bool {
        self.largest_acked_packet_number != 0
            && self.largest_acked_packet_number <= self.largest_sent_at_last_cutback
    }

    /// Returns true if the sender is close enough to using the window for it to grow
    pub fn is_cwnd_limited(&self, bytes_in_flight: u64) -> bool {
        let congestion_window = self.congestion_window();
        if bytes_in_flight >= congestion_window {
            return true;
        }

        // slow start grows the window as long as half of it is in use
        let slow_start_limited = self.in_slow_start() && bytes_in_flight > congestion_window / 2;
        let available_bytes = congestion_window - bytes_in_flight;
        slow_start_limited || available_bytes <= MAX_BURST_PACKETS * MAX_SEGMENT_SIZE
    }

    #[inline]
    pub fn hybrid_slow_start(&self) -> Option<&HybridSlowStart> {
        self.hybrid_slow_start.as_ref()
    }

    /// Multiplicative decrease for Reno, adjusted for the emulated connections
    #[inline]
    fn reno_beta(&self) -> Ratio<u64> {
        let num_connections = Ratio::from_integer(self.num_connections as u64);
        (num_connections - 1 + RENO_BETA) / num_connections
    }
}
