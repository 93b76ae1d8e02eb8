// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::{fmt, time::Duration};
use insta::assert_snapshot;
use s2n_quic_cubic_sender::{
    recovery::{Config, CongestionWindowController, Cubic, Prr, RttEstimator, MAX_SEGMENT_SIZE},
    time::{Clock, NoopClock},
};

#[test]
fn reno_with_two_loss_events() {
    let config = Config::reno()
        .with_num_connections(1)
        .unwrap()
        .with_initial_congestion_window(10)
        .unwrap();

    let simulation = Simulation::new(config, &[4, 9]).run(16);

    assert_snapshot!(simulation, @r"
    01: cwnd=20 ssthresh=2000
    02: cwnd=40 ssthresh=2000
    03: cwnd=80 ssthresh=2000
    04: cwnd=56 ssthresh=56
    05: cwnd=57 ssthresh=56
    06: cwnd=58 ssthresh=56
    07: cwnd=59 ssthresh=56
    08: cwnd=60 ssthresh=56
    09: cwnd=42 ssthresh=42
    10: cwnd=43 ssthresh=42
    11: cwnd=44 ssthresh=42
    12: cwnd=45 ssthresh=42
    13: cwnd=46 ssthresh=42
    14: cwnd=47 ssthresh=42
    15: cwnd=48 ssthresh=42
    16: cwnd=49 ssthresh=42
    ");
}

struct Round {
    number: usize,
    congestion_window: u64,
    slow_start_threshold: u64,
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02}: cwnd={} ssthresh={}",
            self.number, self.congestion_window, self.slow_start_threshold
        )
    }
}

/// Drives a sender that keeps its window full, sending one window of packets per round
struct Simulation<'a> {
    controller: CongestionWindowController<Cubic<NoopClock>>,
    rtt_estimator: RttEstimator,
    prr: Prr,
    /// Rounds in which the first packet sent is lost
    loss_rounds: &'a [usize],
    next_packet_number: u64,
}

impl<'a> Simulation<'a> {
    fn new(config: Config, loss_rounds: &'a [usize]) -> Self {
        let mut rtt_estimator = RttEstimator::default();
        rtt_estimator.update_rtt(
            Duration::ZERO,
            Duration::from_millis(100),
            NoopClock.get_time(),
            true,
        );

        Self {
            controller: CongestionWindowController::new(config, Cubic::new(NoopClock)).unwrap(),
            rtt_estimator,
            prr: Prr::new(),
            loss_rounds,
            next_packet_number: 1,
        }
    }

    fn run(mut self, rounds: usize) -> String {
        (1..=rounds)
            .map(|number| {
                self.round(number);
                Round {
                    number,
                    congestion_window: self.controller.congestion_window_packets(),
                    slow_start_threshold: self.controller.slow_start_threshold_packets(),
                }
                .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn round(&mut self, number: usize) {
        let first = self.next_packet_number;
        let count = self.controller.congestion_window_packets();

        for packet_number in first..first + count {
            assert!(self.controller.on_packet_sent(packet_number, true));
        }
        self.next_packet_number += count;

        for packet_number in first..first + count {
            let bytes_in_flight = self.controller.congestion_window();

            if packet_number == first && self.loss_rounds.contains(&number) {
                self.controller.on_packet_lost(
                    packet_number,
                    MAX_SEGMENT_SIZE,
                    bytes_in_flight,
                    &mut self.prr,
                );
            } else {
                self.controller
                    .on_packet_acked(packet_number, bytes_in_flight, &self.rtt_estimator);
            }
        }
    }
}
