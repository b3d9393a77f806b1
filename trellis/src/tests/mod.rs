// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! We test the component protocol and the passes here, through the public
//! [`testing`](crate::testing) tools, with access to crate internals if needed.

mod deferral;
mod validator;
