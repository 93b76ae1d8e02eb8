// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::time::Timestamp;
use core::time::Duration;

//= https://www.rfc-editor.org/rfc/rfc9002#section-6.2.2
//# When no previous RTT is available, the initial RTT
//# SHOULD be set to 333 milliseconds.
pub const DEFAULT_INITIAL_RTT: Duration = Duration::from_millis(333);

//= https://www.rfc-editor.org/rfc/rfc9000#section-18.2
//# If this value is absent, a default of 25 milliseconds is assumed.
pub const DEFAULT_MAX_ACK_DELAY: Duration = Duration::from_millis(25);

/// Samples below the timer granularity are rounded up to it
const MIN_RTT_SAMPLE: Duration = Duration::from_millis(1);

/// Read-only source of round trip times consumed by the congestion controller
pub trait RttProvider {
    /// The minimum round trip time observed over the lifetime of the connection
    fn min_rtt(&self) -> Duration;
}

/// Round trip time statistics, available once the first sample arrives
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Sampled {
    first_sample_time: Timestamp,
    latest: Duration,
    min: Duration,
    smoothed: Duration,
    variance: Duration,
}

impl Sampled {
    fn new(sample: Duration, timestamp: Timestamp) -> Self {
        //= https://www.rfc-editor.org/rfc/rfc9002#section-5.3
        //# smoothed_rtt = latest_rtt
        //# rttvar = latest_rtt / 2
        Self {
            first_sample_time: timestamp,
            latest: sample,
            min: sample,
            smoothed: sample,
            variance: sample / 2,
        }
    }

    fn smooth(&mut self, adjusted_rtt: Duration) {
        //= https://www.rfc-editor.org/rfc/rfc9002#section-5.3
        //# smoothed_rtt = 7/8 * smoothed_rtt + 1/8 * adjusted_rtt
        //# rttvar_sample = abs(smoothed_rtt - adjusted_rtt)
        //# rttvar = 3/4 * rttvar + 1/4 * rttvar_sample
        let variance_sample = self.smoothed.abs_diff(adjusted_rtt);
        self.variance = (3 * self.variance + variance_sample) / 4;
        self.smoothed = (7 * self.smoothed + adjusted_rtt) / 8;
    }
}

/// Round trip time estimation following
/// [RFC 9002 section 5](https://www.rfc-editor.org/rfc/rfc9002#section-5)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RttEstimator {
    max_ack_delay: Duration,
    sampled: Option<Sampled>,
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ACK_DELAY)
    }
}

impl RttEstimator {
    /// Creates an estimator for a peer that delays acknowledgements by at most `max_ack_delay`
    pub const fn new(max_ack_delay: Duration) -> Self {
        Self {
            max_ack_delay,
            sampled: None,
        }
    }

    /// The most recent sample, or zero before the first sample
    #[inline]
    pub fn latest_rtt(&self) -> Duration {
        self.sampled.map_or(Duration::ZERO, |sampled| sampled.latest)
    }

    #[inline]
    pub fn smoothed_rtt(&self) -> Duration {
        self.sampled
            .map_or(DEFAULT_INITIAL_RTT, |sampled| sampled.smoothed)
    }

    #[inline]
    pub fn rttvar(&self) -> Duration {
        self.sampled
            .map_or(DEFAULT_INITIAL_RTT / 2, |sampled| sampled.variance)
    }

    #[inline]
    pub fn first_rtt_sample(&self) -> Option<Timestamp> {
        self.sampled.map(|sampled| sampled.first_sample_time)
    }

    /// Adds a sample taken from an acknowledgement that newly acknowledged the largest
    /// packet number, delayed by the peer for `ack_delay`
    pub fn update_rtt(
        &mut self,
        ack_delay: Duration,
        rtt_sample: Duration,
        timestamp: Timestamp,
        is_handshake_confirmed: bool,
    ) {
        let latest = rtt_sample.max(MIN_RTT_SAMPLE);

        let Some(sampled) = self.sampled.as_mut() else {
            self.sampled = Some(Sampled::new(latest, timestamp));
            return;
        };

        sampled.latest = latest;
        sampled.min = sampled.min.min(latest);

        //= https://www.rfc-editor.org/rfc/rfc9002#section-5.3
        //# *  MUST use the lesser of the acknowledgment delay and the peer's
        //#    max_ack_delay after the handshake is confirmed;
        let ack_delay = if is_handshake_confirmed {
            ack_delay.min(self.max_ack_delay)
        } else {
            ack_delay
        };

        //= https://www.rfc-editor.org/rfc/rfc9002#section-5.3
        //# *  MUST NOT subtract the acknowledgment delay from the RTT sample if
        //#    the resulting value is smaller than the min_rtt.
        let adjusted_rtt = if sampled.min + ack_delay < latest {
            latest - ack_delay
        } else if is_handshake_confirmed {
            latest
        } else {
            // before the handshake is confirmed an unadjustable sample is discarded
            return;
        };

        sampled.smooth(adjusted_rtt);
    }
}

impl RttProvider for RttEstimator {
    #[inline]
    fn min_rtt(&self) -> Duration {
        self.sampled.map_or(Duration::ZERO, |sampled| sampled.min)
    }
}
