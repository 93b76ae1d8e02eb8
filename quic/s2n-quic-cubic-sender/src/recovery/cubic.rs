// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    recovery::DEFAULT_NUM_CONNECTIONS,
    time::{Clock, Timestamp},
};
use core::{cmp::max, time::Duration};
#[cfg(not(feature = "std"))]
use num_traits::Float as _;

/// The window growth curve consulted by the congestion controller in CUBIC mode.
///
/// All windows are in packets.
pub trait WindowGrowthModel {
    /// Notifies the curve that the connection is not using its window, so the
    /// curve must not advance through the idle period
    fn on_application_limited(&mut self);

    /// Returns the window to use after an acknowledgement received in congestion avoidance
    fn congestion_window_after_ack(&mut self, current_congestion_window: u64, min_rtt: Duration)
        -> u64;

    /// Returns the window to use after a loss, applying multiplicative decrease
    fn congestion_window_after_packet_loss(&mut self, current_congestion_window: u64) -> u64;

    /// Discards all curve state
    fn reset(&mut self);

    /// Sets the number of parallel TCP flows the curve emulates
    fn set_num_connections(&mut self, num_connections: u32);
}

// The cube of time is scaled by 2^40 with time measured in 1/1024 seconds, so
// CUBE_CONGESTION_WINDOW_SCALE / 2^40 * 1024^3 gives the C constant of the curve.
//= https://www.rfc-editor.org/rfc/rfc8312#section-5.1
//# Therefore, C SHOULD be set to 0.4.
const CUBE_SCALE: u32 = 40;
const CUBE_CONGESTION_WINDOW_SCALE: i128 = 410;
const CUBE_FACTOR: u64 = (1 << CUBE_SCALE) / CUBE_CONGESTION_WINDOW_SCALE as u64;

//= https://www.rfc-editor.org/rfc/rfc8312#section-4.5
//# Parameter beta_cubic SHOULD be set to 0.7.
const BETA: f32 = 0.7;

/// Additional backoff applied to the last max window when a loss happens before the
/// window has recovered to it
const BETA_LAST_MAX: f32 = 0.85;

/// Acknowledgements within this interval of the last update reuse the previous target
const MAX_CUBIC_TIME_INTERVAL: Duration = Duration::from_millis(30);

const MICROS_PER_SECOND: u128 = 1_000_000;

/// "CUBIC for Fast Long-Distance Networks" (<https://www.rfc-editor.org/rfc/rfc8312>),
/// computed in whole packets with fixed point time.
#[derive(Clone, Debug)]
pub struct Cubic<C: Clock> {
    clock: C,
    num_connections: u32,
    /// Time when this cycle started, after the last loss event
    epoch: Option<Timestamp>,
    /// Time when the previous target was computed
    last_update_time: Option<Timestamp>,
    /// The window passed in on the previous acknowledgement
    last_congestion_window: u64,
    //= https://www.rfc-editor.org/rfc/rfc8312#section-4.6
    //# a flow remembers the last value of W_max before it
    //# updates W_max for the current congestion event.
    last_max_congestion_window: u64,
    /// Acknowledgements counted towards the next increase of the TCP-friendly window
    acked_packets_count: u64,
    //= https://www.rfc-editor.org/rfc/rfc8312#section-4.2
    //# W_est(t) = W_max*beta_cubic +
    //#            [3*(1-beta_cubic)/(1+beta_cubic)] * (t/RTT) (Eq. 4)
    estimated_tcp_congestion_window: u64,
    /// Origin point of the cubic function
    origin_point_congestion_window: u64,
    /// Time to reach the origin point, in 1/1024 seconds
    time_to_origin_point: u32,
    last_target_congestion_window: u64,
}

impl<C: Clock> Cubic<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            num_connections: DEFAULT_NUM_CONNECTIONS,
            epoch: None,
            last_update_time: None,
            last_congestion_window: 0,
            last_max_congestion_window: 0,
            acked_packets_count: 0,
            estimated_tcp_congestion_window: 0,
            origin_point_congestion_window: 0,
            time_to_origin_point: 0,
            last_target_congestion_window: 0,
        }
    }

    #[inline]
    pub fn num_connections(&self) -> u32 {
        self.num_connections
    }

    /// The window before the reduction of the last congestion event
    #[inline]
    pub fn last_max_congestion_window(&self) -> u64 {
        self.last_max_congestion_window
    }

    /// Multiplicative decrease factor, adjusted for the emulated connections
    #[inline]
    fn beta(&self) -> f32 {
        let num_connections = self.num_connections as f32;
        (num_connections - 1.0 + BETA) / num_connections
    }

    /// Additive increase factor of the TCP-friendly window, adjusted for the emulated connections
    #[inline]
    fn alpha(&self) -> f32 {
        let beta = self.beta();
        let num_connections = self.num_connections as f32;
        3.0 * num_connections * num_connections * (1.0 - beta) / (1.0 + beta)
    }

    /// Starts a new cycle on the first acknowledgement after a loss or an idle period
    fn start_epoch(&mut self, now: Timestamp, current_congestion_window: u64) {
        self.epoch = Some(now);
        self.acked_packets_count = 1;
        // Reset the TCP-friendly window to be in sync with cubic
        self.estimated_tcp_congestion_window = current_congestion_window;

        if self.last_max_congestion_window <= current_congestion_window {
            self.time_to_origin_point = 0;
            self.origin_point_congestion_window = current_congestion_window;
        } else {
            //= https://www.rfc-editor.org/rfc/rfc8312#section-4.1
            //# K = cubic_root(W_max*(1-beta_cubic)/C) (Eq. 2)
            let distance = self.last_max_congestion_window - current_congestion_window;
            let time_to_origin_point = (CUBE_FACTOR.saturating_mul(distance) as f64).cbrt();
            self.time_to_origin_point = time_to_origin_point as u32;
            self.origin_point_congestion_window = self.last_max_congestion_window;
        }
    }
}

impl<C: Clock> WindowGrowthModel for Cubic<C> {
    #[inline]
    fn on_application_limited(&mut self) {
        //= https://www.rfc-editor.org/rfc/rfc8312#section-5.8
        //# CUBIC does not raise its congestion window size if the flow is
        //# currently limited by the application instead of the congestion
        //# window.
        self.epoch = None;
    }

    fn congestion_window_after_ack(
        &mut self,
        current_congestion_window: u64,
        min_rtt: Duration,
    ) -> u64 {
        self.acked_packets_count += 1;
        let now = self.clock.get_time();

        // The curve is a function of time, not of the number of acknowledgements
        if self.last_congestion_window == current_congestion_window {
            if let Some(last_update_time) = self.last_update_time {
                if now - last_update_time <= MAX_CUBIC_TIME_INTERVAL {
                    return max(
                        self.last_target_congestion_window,
                        self.estimated_tcp_congestion_window,
                    );
                }
            }
        }
        self.last_congestion_window = current_congestion_window;
        self.last_update_time = Some(now);

        let epoch = match self.epoch {
            Some(epoch) => epoch,
            None => {
                self.start_epoch(now, current_congestion_window);
                now
            }
        };

        // Target the window one round trip from now, in 1/1024 second units
        let elapsed_time = (((now + min_rtt) - epoch).as_micros() << 10) / MICROS_PER_SECOND;
        let elapsed_time = elapsed_time.min(i64::MAX as u128) as i128;

        //= https://www.rfc-editor.org/rfc/rfc8312#section-4.1
        //# W_cubic(t) = C*(t-K)^3 + W_max (Eq. 1)
        let offset = self.time_to_origin_point as i128 - elapsed_time;
        let offset = offset.clamp(i32::MIN as i128, i32::MAX as i128);
        let delta_congestion_window =
            (CUBE_CONGESTION_WINDOW_SCALE * offset * offset * offset) >> CUBE_SCALE;
        let target_congestion_window = (self.origin_point_congestion_window as i128
            - delta_congestion_window)
            .clamp(0, u64::MAX as i128) as u64;

        debug_assert!(self.estimated_tcp_congestion_window > 0);

        // With a dynamic alpha the required count can drop below the accumulated
        // acknowledgements, which grants more than one packet at once
        let alpha = self.alpha();
        loop {
            let required_ack_count =
                ((self.estimated_tcp_congestion_window as f32 / alpha) as u64).max(1);
            if self.acked_packets_count < required_ack_count {
                break;
            }
            self.acked_packets_count -= required_ack_count;
            self.estimated_tcp_congestion_window += 1;
        }

        self.last_target_congestion_window = target_congestion_window;

        //= https://www.rfc-editor.org/rfc/rfc8312#section-4.2
        //# If W_cubic(t) is less than W_est(t), then the protocol is in the TCP
        //# friendly region and cwnd SHOULD be set to W_est(t) at each reception
        //# of an ACK.
        max(target_congestion_window, self.estimated_tcp_congestion_window)
    }

    fn congestion_window_after_packet_loss(&mut self, current_congestion_window: u64) -> u64 {
        //= https://www.rfc-editor.org/rfc/rfc8312#section-4.6
        //# if (W_max < W_last_max){ // should we make room for others
        //#    W_last_max = W_max;             // remember the last W_max
        //#    W_max = W_max*(1.0+beta_cubic)/2.0; // further reduce W_max
        //# } else {
        //#    W_last_max = W_max              // remember the last W_max
        //# }
        if current_congestion_window < self.last_max_congestion_window {
            // The old max was never reached, so assume another flow is competing and
            // back off further to let it grow
            self.last_max_congestion_window =
                (BETA_LAST_MAX * current_congestion_window as f32) as u64;
        } else {
            self.last_max_congestion_window = current_congestion_window;
        }
        self.epoch = None;

        (current_congestion_window as f32 * self.beta()) as u64
    }

    fn reset(&mut self) {
        self.epoch = None;
        self.last_update_time = None;
        self.last_congestion_window = 0;
        self.last_max_congestion_window = 0;
        self.acked_packets_count = 0;
        self.estimated_tcp_congestion_window = 0;
        self.origin_point_congestion_window = 0;
        self.time_to_origin_point = 0;
        self.last_target_congestion_window = 0;
    }

    #[inline]
    fn set_num_connections(&mut self, num_connections: u32) {
        self.num_connections = num_connections.max(1);
    }
}
