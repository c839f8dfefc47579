// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

pub mod models;
pub mod publish;
#[cfg(feature = "server")]
pub mod server;
pub mod tuned;
pub mod utils;
