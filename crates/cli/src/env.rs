// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves the daemon's Unix socket path using the same environment
//! variables `arcd` resolves its own state directory from, so the two
//! binaries agree on a socket location without sharing a dependency.

use std::path::PathBuf;

use crate::exit_error::ExitError;

fn state_dir() -> Result<PathBuf, ExitError> {
    if let Ok(dir) = std::env::var("ARC_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("arc"));
    }
    let home = std::env::var("HOME")
        .map_err(|_| ExitError::setup("could not determine a state directory: set ARC_STATE_DIR or HOME"))?;
    Ok(PathBuf::from(home).join(".local/state/arc"))
}

/// `ARC_SOCKET_PATH`, else `<state_dir>/arcd.sock`.
pub fn socket_path() -> Result<PathBuf, ExitError> {
    if let Ok(path) = std::env::var("ARC_SOCKET_PATH") {
        return Ok(PathBuf::from(path));
    }
    Ok(state_dir()?.join("arcd.sock"))
}
