// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! The operations of the [`LayoutValidator`](crate::app::LayoutValidator) and of the
//! deferral bridge.
//!
//! This file includes utility functions used by multiple passes.

use tracing::span::EnteredSpan;
use tracing::trace_span;

use crate::core::SurfaceId;

pub(crate) mod defer;
pub(crate) mod invalidate;
pub(crate) mod validate;

#[must_use = "Span will be immediately closed if dropped"]
pub(crate) fn enter_span_if(
    enabled: bool,
    name: &'static str,
    id: SurfaceId,
) -> Option<EnteredSpan> {
    enabled.then(|| trace_span!("HtmlComponent", pass = name, id = id.trace()).entered())
}

/// The environment variable read by [`PassTracing::from_env`].
pub(crate) const TRACE_PASSES_ENV_VAR: &str = "TRELLIS_TRACE_PASSES";

/// Selects which operations emit a span per component.
///
/// A single user-visible change can invalidate and validate hundreds of components,
/// so including each of them in traces adds noise and makes operations much slower.
/// These spans are therefore disabled by default. The per-pass spans (`validate`,
/// `invalidate_tree`) are always emitted.
///
/// Using the default tracing filtering mechanism for this would be non-ideal, as it
/// would prevent child spans of the component from running, which may make end-user
/// debugging harder.
///
/// The defaults are read from the `TRELLIS_TRACE_PASSES` environment variable, which
/// holds a comma separated list of pass names, or `all`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassTracing {
    /// Tree invalidation and local invalidation.
    pub invalidate: bool,
    /// Validation of individual components.
    pub validate: bool,
    /// Preferred size computations, including cache hits.
    pub pref_size: bool,
    /// Deferral registration and retries.
    pub defer: bool,
}

impl PassTracing {
    /// Reads the configuration from the `TRELLIS_TRACE_PASSES` environment variable.
    ///
    /// If the variable is unset, no pass is traced.
    pub fn from_env() -> Self {
        let env_var = match std::env::var(TRACE_PASSES_ENV_VAR) {
            Ok(env_var) => env_var,
            // If it's not set, don't show any passes.
            Err(std::env::VarError::NotPresent) => return Self::unit(false),
            Err(std::env::VarError::NotUnicode(value)) => {
                tracing::error!(
                    ?value,
                    "Couldn't parse `TRELLIS_TRACE_PASSES` environment variable: Not valid UTF-8",
                );
                return Self::unit(false);
            }
        };
        Self::parse(&env_var)
    }

    /// Parses a comma separated list of pass names.
    ///
    /// Unknown names are reported with `tracing::warn` and ignored.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Self::unit(true);
        }
        let mut result = Self::unit(false);
        if value.is_empty() {
            return result;
        }
        let mut show_help = false;
        let mut supported_passes = [
            ("invalidate", &mut result.invalidate),
            ("validate", &mut result.validate),
            ("pref_size", &mut result.pref_size),
            ("defer", &mut result.defer),
        ];
        for input_name in value.split(',').map(str::trim) {
            if input_name.eq_ignore_ascii_case("all") {
                tracing::warn!(
                    "`TRELLIS_TRACE_PASSES=all` cannot be meaningfully combined with other passes"
                );
                return Self::unit(true);
            }
            if let Some((_, value)) = supported_passes
                .iter_mut()
                .find(|(pass_name, _)| pass_name.eq_ignore_ascii_case(input_name))
            {
                if **value {
                    tracing::warn!(
                        pass = input_name,
                        "TRELLIS_TRACE_PASSES: Enabled tracing for same pass twice"
                    );
                }
                **value = true;
            } else {
                tracing::warn!(pass = input_name, "TRELLIS_TRACE_PASSES: Unknown pass");
                show_help = true;
            }
        }
        if show_help {
            let supported_str = supported_passes
                .iter()
                .map(|(name, _)| name)
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                "Supported passes for the `TRELLIS_TRACE_PASSES` environment variable are {supported_str}"
            );
        }
        result
    }

    /// A `PassTracing` where all the fields have the same `value`.
    pub const fn unit(value: bool) -> Self {
        Self {
            invalidate: value,
            validate: value,
            pref_size: value,
            defer: value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pass_list() {
        let tracing = PassTracing::parse(" validate, DEFER ");
        assert!(tracing.validate);
        assert!(tracing.defer);
        assert!(!tracing.invalidate);
        assert!(!tracing.pref_size);
    }

    #[test]
    fn parse_all_and_unknown() {
        assert_eq!(PassTracing::parse("all"), PassTracing::unit(true));
        assert_eq!(PassTracing::parse("layout,paint"), PassTracing::unit(false));
        assert_eq!(PassTracing::parse(""), PassTracing::unit(false));
    }
}
