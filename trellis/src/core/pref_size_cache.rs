// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use kurbo::Size;

use crate::core::PrefSizeOptions;

/// All the caller-facing inputs that change [`pref_size`] output.
///
/// These are the hints as the caller passed them, before margin and insets are removed.
/// Notably this doesn't include styling, because any styling change must be followed
/// by an invalidation, which clears the cache.
///
/// Hints are compared by their bits, so a `NaN` hint matches itself.
///
/// [`pref_size`]: crate::core::ComponentMut::pref_size
#[derive(Copy, Clone, Debug)]
pub struct PrefSizeKey {
    /// The width hint, if any.
    pub width_hint: Option<f64>,
    /// The height hint, if any.
    pub height_hint: Option<f64>,
    /// Whether only the width was requested.
    pub width_only: bool,
}

impl PrefSizeKey {
    /// Creates the key for the given options.
    pub fn new(options: &PrefSizeOptions) -> Self {
        Self {
            width_hint: options.width_hint,
            height_hint: options.height_hint,
            width_only: options.width_only,
        }
    }
}

impl PartialEq for PrefSizeKey {
    fn eq(&self, other: &Self) -> bool {
        let bits = |hint: Option<f64>| hint.map(f64::to_bits);
        bits(self.width_hint) == bits(other.width_hint)
            && bits(self.height_hint) == bits(other.height_hint)
            && self.width_only == other.width_only
    }
}

impl Eq for PrefSizeKey {}

/// Contains a mapping of [`PrefSizeKey`] to preferred sizes.
///
/// Implemented as a linear search over [`Vec`] with the most recently used entry
/// in front, because we expect a component to be measured with a handful of
/// distinct hints between two invalidations.
///
/// There is no eviction: the cache is emptied on every invalidation, and nothing else
/// may drop an entry, otherwise a lookup could call the algorithm a second time for the
/// same hints.
#[derive(Clone, Debug, Default)]
pub(crate) struct PrefSizeCache {
    entries: Vec<(PrefSizeKey, Size)>,
}

impl PrefSizeCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts the `size` for the given `key` into the cache.
    pub(crate) fn insert(&mut self, key: PrefSizeKey, size: Size) {
        if let Some(index) = self.entries.iter().position(|e| e.0 == key) {
            self.entries[0..=index].rotate_right(1);
            self.entries[0].1 = size;
            return;
        }
        self.entries.insert(0, (key, size));
    }

    /// Gets the cached size for the given `key`.
    pub(crate) fn get(&mut self, key: &PrefSizeKey) -> Option<Size> {
        let index = self.entries.iter().position(|e| &e.0 == key)?;
        if index > 0 {
            // Keep recently referenced entries in front
            self.entries[0..=index].rotate_right(1);
        }
        Some(self.entries[0].1)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &PrefSizeKey> {
        self.entries.iter().map(|e| &e.0)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
