// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::recovery::MAX_SEGMENT_SIZE;

/// Throttles transmission during a loss recovery episode, independently of the
/// congestion window value
pub trait RecoveryPacer {
    /// Called for every loss that causes a congestion window cutback, with the
    /// number of bytes in flight when the loss was detected
    fn on_packet_lost(&mut self, bytes_in_flight: u64);
}

/// Proportional Rate Reduction (<https://www.rfc-editor.org/rfc/rfc6937>).
///
/// Spreads the window reduction of a loss event over the acknowledgements that arrive
/// during recovery instead of pausing transmission until enough data has drained.
/// The connection reports sends and acknowledgements while the controller is in
/// recovery and asks [`Prr::can_send`] before transmitting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prr {
    /// prr_out
    bytes_sent_since_loss: u64,
    /// prr_delivered
    bytes_delivered_since_loss: u64,
    acks_since_loss: u64,
    /// RecoverFS
    bytes_in_flight_before_loss: u64,
}

impl Prr {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn on_packet_sent(&mut self, sent_bytes: u64) {
        self.bytes_sent_since_loss += sent_bytes;
    }

    #[inline]
    pub fn on_packet_acked(&mut self, acked_bytes: u64) {
        self.bytes_delivered_since_loss += acked_bytes;
        self.acks_since_loss += 1;
    }

    /// Returns true if another packet may be sent during recovery
    pub fn can_send(
        &self,
        congestion_window: u64,
        bytes_in_flight: u64,
        slow_start_threshold: u64,
    ) -> bool {
        // Always allow the first retransmission, and limited transmit once the pipe drains
        if self.bytes_sent_since_loss == 0 || bytes_in_flight < MAX_SEGMENT_SIZE {
            return true;
        }

        if congestion_window > bytes_in_flight {
            //= https://www.rfc-editor.org/rfc/rfc6937#section-3.1
            //# limit = MAX(prr_delivered - prr_out, DeliveredData) + MSS
            // Allow one extra segment per acknowledgement, which avoids a burst of
            // retransmissions when more packets were lost than the window reduction
            let limit =
                self.bytes_delivered_since_loss + self.acks_since_loss * MAX_SEGMENT_SIZE;
            return limit > self.bytes_sent_since_loss;
        }

        //= https://www.rfc-editor.org/rfc/rfc6937#section-3.1
        //# sndcnt = CEIL(prr_delivered * ssthresh / RecoverFS) - prr_out
        // compared without the division
        let delivered = self.bytes_delivered_since_loss as u128 * slow_start_threshold as u128;
        let sent = self.bytes_sent_since_loss as u128 * self.bytes_in_flight_before_loss as u128;
        delivered > sent
    }
}

impl RecoveryPacer for Prr {
    #[inline]
    fn on_packet_lost(&mut self, bytes_in_flight: u64) {
        *self = Self {
            bytes_in_flight_before_loss: bytes_in_flight,
            ..Self::default()
        };
    }
}
