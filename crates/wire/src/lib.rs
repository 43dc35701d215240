// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between `arc-cli` and `arcd` (spec §6).
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

mod manifest;
mod request;
mod response;
mod wire;

pub use manifest::{
    ExecutionManifest, ManifestOperation, ManifestShortcut, ManifestStatistics,
    VersionChainManifest, VersionManifestEntry,
};
pub use request::Request;
pub use response::{JobReport, Response};
pub use wire::{decode, encode, read_message, read_request, write_message, write_response, ProtocolError};
