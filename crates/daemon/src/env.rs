// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::error::DaemonError;

/// Resolve state directory: `ARC_STATE_DIR` > `XDG_STATE_HOME/arc` > `~/.local/state/arc`.
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("ARC_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("arc"));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/arc"))
}

/// Unix socket path: `ARC_SOCKET_PATH`, else `<state_dir>/arcd.sock`.
pub fn socket_path(state_dir: &std::path::Path) -> PathBuf {
    std::env::var("ARC_SOCKET_PATH").map(PathBuf::from).unwrap_or_else(|_| state_dir.join("arcd.sock"))
}

/// Base config file path: `ARC_CONFIG_PATH`, else `<state_dir>/config.toml`.
pub fn config_path(state_dir: &std::path::Path) -> PathBuf {
    std::env::var("ARC_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| state_dir.join("config.toml"))
}

/// Optional admin-UI config override, `ARC_CONFIG_OVERRIDE_PATH` if set.
pub fn config_override_path() -> Option<PathBuf> {
    std::env::var("ARC_CONFIG_OVERRIDE_PATH").ok().map(PathBuf::from)
}
