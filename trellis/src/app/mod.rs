// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! Types needed for running Trellis in a host.

mod layout_root;
mod layout_validator;
mod tracing_backend;

pub use layout_root::{LayoutRoot, LayoutRootOptions, LayoutSignal};
pub use layout_validator::{LayoutValidator, PostValidateFn};
pub use tracing_backend::{
    TracingSubscriberHasBeenSetError, default_tracing_subscriber, try_init_test_tracing,
    try_init_tracing,
};

pub use crate::passes::PassTracing;
