// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::recovery::PacketNumber;
use core::time::Duration;

/// Windows below this many packets never leave slow start early.
/// Defined as "hystart_low_window" in tcp_cubic.c
const LOW_WINDOW: u64 = 16;
/// RTT samples taken at the start of each round.
/// Defined as "HYSTART_MIN_SAMPLES" in tcp_cubic.c
const MIN_SAMPLES: u32 = 8;
/// Bounds of the delay increase that signals a filling queue.
/// Defined as "HYSTART_DELAY_MIN" and "HYSTART_DELAY_MAX" in tcp_cubic.c
const MIN_DELAY_THRESHOLD: Duration = Duration::from_millis(4);
const MAX_DELAY_THRESHOLD: Duration = Duration::from_millis(16);
/// The tolerated delay increase is the minimum RTT divided by 8
const DELAY_THRESHOLD_SHIFT: u32 = 3;

/// Delay-based slow start exit from "Hybrid Slow Start for High-Bandwidth and
/// Long-Distance Networks".
///
/// A round spans the packets in flight when it started and ends once the last of them is
/// acknowledged. The lowest RTT of the first samples in a round is compared against the
/// connection's minimum RTT; a rise beyond the threshold means queues are building.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HybridSlowStart {
    started: bool,
    found: bool,
    last_sent_packet_number: PacketNumber,
    end_packet_number: PacketNumber,
    sample_count: u32,
    round_min_rtt: Duration,
}

impl HybridSlowStart {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn on_packet_sent(&mut self, packet_number: PacketNumber) {
        self.last_sent_packet_number = packet_number;
    }

    /// Ends the round once the last packet sent before it started is acknowledged
    #[inline]
    pub fn on_packet_acked(&mut self, packet_number: PacketNumber) {
        if self.is_end_of_round(packet_number) {
            self.started = false;
        }
    }

    /// Forgets the current round and any detected exit, for a fresh slow start
    #[inline]
    pub fn restart(&mut self) {
        self.started = false;
        self.found = false;
    }

    #[inline]
    pub fn started(&self) -> bool {
        self.started
    }

    #[inline]
    pub fn is_end_of_round(&self, packet_number: PacketNumber) -> bool {
        self.end_packet_number <= packet_number
    }

    /// Returns true once the window is large enough and the delay has grown enough to
    /// leave slow start
    pub fn should_exit_slow_start(
        &mut self,
        latest_rtt: Duration,
        min_rtt: Duration,
        congestion_window: u64,
    ) -> bool {
        if !self.started {
            self.start_round();
        }

        if self.found {
            return true;
        }

        self.sample_count += 1;
        if self.sample_count <= MIN_SAMPLES
            && (self.round_min_rtt.is_zero() || self.round_min_rtt > latest_rtt)
        {
            self.round_min_rtt = latest_rtt;
        }

        if self.sample_count == MIN_SAMPLES {
            let threshold = (min_rtt / (1 << DELAY_THRESHOLD_SHIFT))
                .clamp(MIN_DELAY_THRESHOLD, MAX_DELAY_THRESHOLD);
            self.found = self.round_min_rtt > min_rtt + threshold;
        }

        congestion_window >= LOW_WINDOW && self.found
    }

    fn start_round(&mut self) {
        self.started = true;
        self.end_packet_number = self.last_sent_packet_number;
        self.round_min_rtt = Duration::ZERO;
        self.sample_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN_RTT: Duration = Duration::from_millis(60);

    /// Feeds a round of samples and returns the final verdict
    fn sample(hss: &mut HybridSlowStart, rtt: Duration, samples: u32, cwnd: u64) -> bool {
        let mut exit = false;
        for _ in 0..samples {
            exit = hss.should_exit_slow_start(rtt, MIN_RTT, cwnd);
        }
        exit
    }

    #[test]
    fn rounds_follow_packet_numbers() {
        let mut hss = HybridSlowStart::new();
        hss.on_packet_sent(10);
        assert!(!hss.started());

        hss.should_exit_slow_start(MIN_RTT, MIN_RTT, 20);
        assert!(hss.started());

        // packets sent afterwards extend the next round, not this one
        hss.on_packet_sent(20);
        hss.on_packet_acked(9);
        assert!(hss.started());
        hss.on_packet_acked(10);
        assert!(!hss.started());

        hss.should_exit_slow_start(MIN_RTT, MIN_RTT, 20);
        assert!(!hss.is_end_of_round(19));
        assert!(hss.is_end_of_round(20));
    }

    #[test]
    fn delay_increase_exits_slow_start() {
        let mut hss = HybridSlowStart::new();
        hss.on_packet_sent(1);

        // 60ms / 8 is 7.5ms, so 67ms stays within the threshold
        assert!(!sample(&mut hss, Duration::from_millis(67), 8, 20));

        hss.on_packet_acked(1);
        hss.on_packet_sent(2);
        assert!(sample(&mut hss, Duration::from_millis(68), 8, 20));

        // the decision sticks until restarted
        assert!(hss.should_exit_slow_start(MIN_RTT, MIN_RTT, 20));
        hss.restart();
        assert!(!hss.should_exit_slow_start(MIN_RTT, MIN_RTT, 20));
    }

    #[test]
    fn only_the_first_samples_count() {
        let mut hss = HybridSlowStart::new();
        hss.on_packet_sent(1);

        assert!(!sample(&mut hss, MIN_RTT, 8, 20));
        // later samples in the same round are ignored
        assert!(!sample(&mut hss, Duration::from_secs(1), 100, 20));
    }

    #[test]
    fn small_windows_stay_in_slow_start() {
        let mut hss = HybridSlowStart::new();
        hss.on_packet_sent(1);

        assert!(!sample(&mut hss, Duration::from_millis(100), 8, LOW_WINDOW - 1));
        // the delay increase was recorded and applies once the window grows
        assert!(hss.should_exit_slow_start(MIN_RTT, MIN_RTT, LOW_WINDOW));
    }

    #[test]
    fn threshold_is_clamped() {
        // 8ms / 8 is below the 4ms floor
        let mut hss = HybridSlowStart::new();
        let min_rtt = Duration::from_millis(8);
        let mut exit = false;
        for _ in 0..8 {
            exit = hss.should_exit_slow_start(Duration::from_millis(12), min_rtt, 20);
        }
        assert!(!exit);

        // 400ms / 8 is above the 16ms ceiling
        let mut hss = HybridSlowStart::new();
        let min_rtt = Duration::from_millis(400);
        for _ in 0..8 {
            exit = hss.should_exit_slow_start(Duration::from_millis(417), min_rtt, 20);
        }
        assert!(exit);
    }
}
