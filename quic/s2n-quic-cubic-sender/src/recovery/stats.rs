// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

/// Loss and slow start counters recorded by the congestion controller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Retransmittable packets sent while in slow start
    pub slowstart_packets_sent: u64,
    /// Packets lost while in slow start, or charged to a slow start cutback
    pub slowstart_packets_lost: u64,
    /// Bytes lost after a slow start cutback
    pub slowstart_bytes_lost: u64,
    /// Losses that caused a congestion window cutback
    pub loss_events: u64,
}
