// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

use kurbo::{Rect, Size};

use crate::core::{ComponentMut, LayoutAlgorithm, LayoutError, PrefSizeOptions};
use crate::util::{add_insets, remove_insets};

/// A minimal container algorithm: stacks child components vertically.
///
/// Each child gets the full content width and its preferred height for that width.
/// Child margins are respected. This is enough to exercise the top-down flow of
/// validation, where assigning bounds to a child validates it.
#[derive(Clone, Copy, Debug, Default)]
pub struct StackLayout {
    /// Vertical space between children.
    pub gap: f64,
}

impl StackLayout {
    /// A stack without gaps.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack with `gap` between children.
    pub fn with_gap(gap: f64) -> Self {
        Self { gap }
    }
}

impl LayoutAlgorithm for StackLayout {
    fn preferred_layout_size(
        &self,
        ctx: &mut ComponentMut<'_>,
        hints: &PrefSizeOptions,
    ) -> Result<Size, LayoutError> {
        let child_options = PrefSizeOptions {
            include_margin: true,
            width_hint: hints.width_hint,
            width_only: hints.width_only,
            ..PrefSizeOptions::default()
        };
        let mut content = Size::ZERO;
        let mut stacked = 0;
        for child in ctx.children() {
            let mut child = ctx.component_mut(child)?;
            if !child.is_visible() {
                continue;
            }
            let child_size = child.pref_size(child_options)?;
            content.width = content.width.max(child_size.width);
            content.height += child_size.height;
            if stacked > 0 {
                content.height += self.gap;
            }
            stacked += 1;
        }
        Ok(add_insets(content, ctx.insets()))
    }

    fn layout(&self, ctx: &mut ComponentMut<'_>) -> Result<(), LayoutError> {
        let insets = ctx.insets();
        let content = remove_insets(ctx.available_size(true)?, insets);
        let mut y = insets.y0;
        for child in ctx.children() {
            let mut child = ctx.component_mut(child)?;
            let margins = child.margins();
            let pref_size = child.pref_size(PrefSizeOptions::with_width_hint(content.width))?;
            let bounds = Rect::new(
                insets.x0 + margins.x0,
                y + margins.y0,
                insets.x0 + content.width - margins.x1,
                y + margins.y0 + pref_size.height,
            );
            child.set_bounds(bounds)?;
            if child.is_visible() {
                y = bounds.y1 + margins.y1 + self.gap;
            }
        }
        Ok(())
    }

    fn css_class(&self) -> Option<&str> {
        Some("stack-layout")
    }
}
