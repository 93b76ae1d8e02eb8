// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    recovery::{
        Config, CongestionWindowController, Cubic, Mode, PacketNumber, Prr, RttEstimator,
        MAX_SEGMENT_SIZE,
    },
    time::{testing, Clock as _, Duration},
};
use bolero::{check, generator::*};
use std::collections::VecDeque;

#[derive(Debug, TypeGenerator)]
struct Scenario {
    mode: Mode,
    /// Windows of one packet cannot be decremented in slow start
    #[generator(2..=4)]
    min_congestion_window: u64,
    #[generator(4..=100)]
    initial_congestion_window: u64,
    #[generator(100..=2000)]
    max_congestion_window: u64,
    #[generator(1..=4)]
    num_connections: u32,
    slow_start_large_reduction: bool,
    byte_conservation: bool,
    hybrid_slow_start: bool,
    operations: Vec<Operation>,
}

#[derive(Debug, TypeGenerator)]
enum Operation {
    IncrementTime {
        /// The milli-second value by which to increase the timestamp
        millis: u16,
    },
    PacketSent {
        #[generator(1..=64)]
        count: u8,
    },
    RttUpdated {
        #[generator(1..=2000)]
        millis: u64,
    },
    AckReceived {
        #[generator(1..=64)]
        count: u8,
    },
    PacketLost {
        lost_bytes: u16,
    },
    RetransmissionTimeout {
        packets_retransmitted: bool,
    },
    ConnectionMigration,
    ExitSlowStart,
    SetNumConnections {
        #[generator(0..=8)]
        num_connections: u32,
    },
}

struct Model {
    /// The congestion controller being fuzzed
    subject: CongestionWindowController<Cubic<testing::Clock>>,
    /// Packets in flight, oldest first
    sent_packets: VecDeque<PacketNumber>,
    next_packet_number: PacketNumber,
    rtt_estimator: RttEstimator,
    prr: Prr,
}

impl Model {
    fn new(scenario: &Scenario) -> Self {
        testing::reset();

        let config = Config::new()
            .with_mode(scenario.mode)
            .with_min_congestion_window(scenario.min_congestion_window)
            .unwrap()
            .with_initial_congestion_window(scenario.initial_congestion_window)
            .unwrap()
            .with_max_congestion_window(scenario.max_congestion_window)
            .unwrap()
            .with_num_connections(scenario.num_connections)
            .unwrap()
            .with_slow_start_large_reduction(scenario.slow_start_large_reduction)
            .with_byte_conservation(scenario.byte_conservation)
            .with_hybrid_slow_start(scenario.hybrid_slow_start);

        let growth = Cubic::new(testing::Clock::default());

        Self {
            subject: CongestionWindowController::new(config, growth).unwrap(),
            sent_packets: VecDeque::new(),
            next_packet_number: 1,
            rtt_estimator: RttEstimator::default(),
            prr: Prr::new(),
        }
    }

    fn bytes_in_flight(&self) -> u64 {
        self.sent_packets.len() as u64 * MAX_SEGMENT_SIZE
    }

    fn apply(&mut self, operation: &Operation) {
        match operation {
            Operation::IncrementTime { millis } => {
                testing::advance(Duration::from_millis(*millis as u64));
            }
            Operation::PacketSent { count } => self.on_packet_sent(*count),
            Operation::RttUpdated { millis } => {
                let now = testing::Clock::default().get_time();
                self.rtt_estimator
                    .update_rtt(Duration::ZERO, Duration::from_millis(*millis), now, true);

                let congestion_window = self.subject.congestion_window_packets();
                self.subject
                    .on_rtt_updated(self.rtt_estimator.latest_rtt(), &self.rtt_estimator);
                assert_eq!(self.subject.congestion_window_packets(), congestion_window);
            }
            Operation::AckReceived { count } => self.on_ack_received(*count),
            Operation::PacketLost { lost_bytes } => self.on_packet_lost(*lost_bytes as u64),
            Operation::RetransmissionTimeout {
                packets_retransmitted,
            } => {
                self.subject.on_retransmission_timeout(*packets_retransmitted);
                assert_eq!(self.subject.largest_sent_at_last_cutback(), 0);
            }
            Operation::ConnectionMigration => {
                self.subject.on_connection_migration();
                self.sent_packets.clear();
                self.next_packet_number = 1;
                self.prr = Prr::new();
            }
            Operation::ExitSlowStart => {
                self.subject.exit_slow_start();
                assert!(!self.subject.in_slow_start());
            }
            Operation::SetNumConnections { num_connections } => {
                self.subject.set_num_emulated_connections(*num_connections);
                assert!(self.subject.num_connections() >= 1);
                assert_eq!(
                    self.subject.growth_model().num_connections(),
                    self.subject.num_connections()
                );
            }
        }
    }

    fn on_packet_sent(&mut self, count: u8) {
        for _ in 0..count {
            if self.subject.in_recovery() {
                // a pacer that refuses to send leaves the sender waiting for acknowledgements
                let bytes_in_flight = self.bytes_in_flight();
                if !self.prr.can_send(
                    self.subject.congestion_window(),
                    bytes_in_flight,
                    self.subject.slow_start_threshold(),
                ) {
                    return;
                }
                self.prr.on_packet_sent(MAX_SEGMENT_SIZE);
            }

            let packet_number = self.next_packet_number;
            self.next_packet_number += 1;
            assert!(self.subject.on_packet_sent(packet_number, true));
            self.sent_packets.push_back(packet_number);
        }
    }

    fn on_ack_received(&mut self, count: u8) {
        for _ in 0..count {
            let Some(packet_number) = self.sent_packets.pop_front() else {
                break;
            };

            let in_recovery = packet_number <= self.subject.largest_sent_at_last_cutback();
            let congestion_window = self.subject.congestion_window_packets();
            let bytes_in_flight = self.bytes_in_flight();

            self.subject
                .on_packet_acked(packet_number, bytes_in_flight, &self.rtt_estimator);

            if in_recovery {
                assert!(self.subject.in_recovery());
                assert_eq!(
                    self.subject.congestion_window_packets(),
                    congestion_window,
                    "the window must not grow during recovery"
                );
                self.prr.on_packet_acked(MAX_SEGMENT_SIZE);
            }
        }
    }

    fn on_packet_lost(&mut self, lost_bytes: u64) {
        let Some(packet_number) = self.sent_packets.pop_front() else {
            return;
        };

        let same_loss_event = packet_number <= self.subject.largest_sent_at_last_cutback();
        let congestion_window = self.subject.congestion_window_packets();
        let loss_events = self.subject.stats().loss_events;
        let bytes_in_flight = self.bytes_in_flight();

        self.subject
            .on_packet_lost(packet_number, lost_bytes, bytes_in_flight, &mut self.prr);

        if same_loss_event {
            assert!(self.subject.congestion_window_packets() <= congestion_window);
            assert_eq!(self.subject.stats().loss_events, loss_events);
        } else {
            assert_eq!(self.subject.stats().loss_events, loss_events + 1);
            assert_eq!(
                self.subject.largest_sent_at_last_cutback(),
                self.next_packet_number - 1
            );
            assert!(!self.subject.in_slow_start());
        }
    }

    fn invariants(&self) {
        let congestion_window = self.subject.congestion_window_packets();
        assert!(congestion_window >= self.subject.min_congestion_window_packets());
        assert!(congestion_window <= self.subject.max_congestion_window_packets());
        assert!(self.subject.largest_sent_at_last_cutback() < self.next_packet_number);
        assert_eq!(
            self.subject.congestion_window(),
            congestion_window * MAX_SEGMENT_SIZE
        );
    }
}

#[test]
fn congestion_window_fuzz() {
    check!().with_type::<Scenario>().for_each(|scenario| {
        let mut model = Model::new(scenario);

        for operation in scenario.operations.iter() {
            model.apply(operation);
            model.invariants();
        }
    });
}
