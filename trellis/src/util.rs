// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! Miscellaneous utility functions.

use kurbo::{Insets, Size};

/// Panic in debug and `tracing::error` in release mode.
///
/// Used for misuse of the API that Trellis can recover from, such as
/// invalidating a surface node which has no component.
#[macro_export]
macro_rules! debug_panic {
    ($msg:expr$(,)?) => {
        if cfg!(debug_assertions) {
            panic!($msg);
        } else {
            tracing::error!($msg);
        }
    };
    ($fmt:expr, $($arg:tt)+) => {
        if cfg!(debug_assertions) {
            panic!($fmt, $($arg)*);
        } else {
            tracing::error!($fmt, $($arg)*);
        }
    };
}

pub use crate::debug_panic;

/// Grows `size` by the total horizontal and vertical extent of `insets`.
pub fn add_insets(size: Size, insets: Insets) -> Size {
    Size::new(size.width + insets.x_value(), size.height + insets.y_value())
}

/// Shrinks `size` by the total horizontal and vertical extent of `insets`.
///
/// The result may be negative; callers clamp it where that matters.
pub fn remove_insets(size: Size, insets: Insets) -> Size {
    Size::new(size.width - insets.x_value(), size.height - insets.y_value())
}

/// Clamps each dimension of `size` into `[min, max]`.
///
/// The lower bound is applied first, so `max` wins when `min > max`.
pub fn clamp_size(size: Size, min: Size, max: Size) -> Size {
    Size::new(
        size.width.max(min.width).min(max.width),
        size.height.max(min.height).min(max.height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_prefers_max_on_conflict() {
        let clamped = clamp_size(
            Size::new(10., 500.),
            Size::new(50., 0.),
            Size::new(40., 100.),
        );
        assert_eq!(clamped, Size::new(40., 100.));
    }

    #[test]
    fn insets_round_trip() {
        let insets = Insets::new(1., 2., 3., 4.);
        let size = Size::new(20., 20.);
        assert_eq!(add_insets(size, insets), Size::new(24., 26.));
        assert_eq!(remove_insets(add_insets(size, insets), insets), size);
    }
}
