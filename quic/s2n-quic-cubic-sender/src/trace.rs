// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Debug logging of congestion window transitions
//!
//! Enabled with the `state-tracing` feature. Otherwise the macro expands to nothing.

#[macro_export]
#[doc(hidden)]
macro_rules! __tracing_noop__ {
    ($($fmt:tt)*) => {};
}

#[cfg(feature = "state-tracing")]
#[doc(hidden)]
pub use tracing::debug;

#[cfg(not(feature = "state-tracing"))]
#[doc(hidden)]
pub use crate::__tracing_noop__ as debug;

