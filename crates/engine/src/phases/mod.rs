// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The five pipeline phases (spec §4.5-§4.9), each a free function over a
//! shared [`PhaseContext`] so the job controller can sequence them uniformly.

pub mod duplicate_resolver;
pub mod executor;
pub mod indexer;
pub mod organization_planner;
pub mod version_resolver;

use arc_core::Clock;
use arc_store::Store;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared handles every phase needs: the store, a clock for timestamps, and
/// a cancellation token checked cooperatively (spec §4.10, §5).
#[derive(Clone)]
pub struct PhaseContext<C: Clock> {
    pub store: Arc<Store>,
    pub clock: C,
    pub cancel: CancellationToken,
}

impl<C: Clock> PhaseContext<C> {
    pub fn new(store: Arc<Store>, clock: C, cancel: CancellationToken) -> Self {
        Self { store, clock, cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
