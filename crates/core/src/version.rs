// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `VersionChain` / `VersionChainMember` (spec §3, §4.7).

use crate::config::VersionArchiveStrategy;
use crate::document_item::DocumentItemId;
use crate::job::JobId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct VersionChainId("ver-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    ExplicitMarker,
    NameSimilarity,
    ContentSimilarity,
}

crate::simple_display! {
    DetectionMethod {
        ExplicitMarker => "explicit_marker",
        NameSimilarity => "name_similarity",
        ContentSimilarity => "content_similarity",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionMemberStatus {
    Active,
    Superseded,
    Archived,
}

crate::simple_display! {
    VersionMemberStatus {
        Active => "active",
        Superseded => "superseded",
        Archived => "archived",
    }
}

/// A detected group of successive versions of the same conceptual document
/// (spec §3 `VersionChain`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionChain {
    pub id: VersionChainId,
    pub job_id: JobId,
    pub chain_name: String,
    pub base_path: String,
    pub current_document_id: DocumentItemId,
    pub current_version_number: u32,
    pub detection_method: DetectionMethod,
    pub detection_confidence: f64,
    pub llm_reasoning: Option<String>,
    pub version_order_confirmed: bool,
    pub archive_strategy: VersionArchiveStrategy,
    pub archive_path: Option<String>,
}

/// One file's membership within a `VersionChain` (spec §3 `VersionChainMember`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionChainMember {
    pub chain_id: VersionChainId,
    pub document_id: DocumentItemId,
    pub version_number: u32,
    pub version_label: Option<String>,
    pub version_date: Option<String>,
    pub is_current: bool,
    pub status: VersionMemberStatus,
    pub proposed_version_name: Option<String>,
    pub proposed_version_path: Option<String>,
}

impl VersionChainMember {
    /// Invariant: the current member is active, others are superseded/archived (spec §3, §8 P3).
    pub fn is_consistent(&self) -> bool {
        if self.is_current {
            self.status == VersionMemberStatus::Active
        } else {
            matches!(self.status, VersionMemberStatus::Superseded | VersionMemberStatus::Archived)
        }
    }
}

/// Validate chain invariants: unique version numbers, exactly one current
/// member, and internal status consistency (spec §3, §8 P3).
pub fn validate_chain_members(members: &[VersionChainMember]) -> bool {
    let mut seen = std::collections::HashSet::new();
    let unique_versions = members.iter().all(|m| seen.insert(m.version_number));
    let current_count = members.iter().filter(|m| m.is_current).count();
    unique_versions && current_count == 1 && members.iter().all(VersionChainMember::is_consistent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(version_number: u32, is_current: bool, status: VersionMemberStatus) -> VersionChainMember {
        VersionChainMember {
            chain_id: VersionChainId::new(),
            document_id: DocumentItemId::new(),
            version_number,
            version_label: None,
            version_date: None,
            is_current,
            status,
            proposed_version_name: None,
            proposed_version_path: None,
        }
    }

    #[test]
    fn three_member_chain_is_valid() {
        let members = vec![
            member(1, false, VersionMemberStatus::Superseded),
            member(2, false, VersionMemberStatus::Archived),
            member(3, true, VersionMemberStatus::Active),
        ];
        assert!(validate_chain_members(&members));
    }

    #[test]
    fn duplicate_version_numbers_are_invalid() {
        let members = vec![member(1, false, VersionMemberStatus::Superseded), member(1, true, VersionMemberStatus::Active)];
        assert!(!validate_chain_members(&members));
    }

    #[test]
    fn two_current_members_are_invalid() {
        let members = vec![member(1, true, VersionMemberStatus::Active), member(2, true, VersionMemberStatus::Active)];
        assert!(!validate_chain_members(&members));
    }

    #[test]
    fn current_member_must_be_active() {
        let bad = member(3, true, VersionMemberStatus::Superseded);
        assert!(!bad.is_consistent());
    }
}
