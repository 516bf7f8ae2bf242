// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration types for hellofs

use serde::{Deserialize, Serialize};

use crate::tree::TreeDescription;

/// Kernel cache lifetimes handed back with attribute and entry replies
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    pub attr_ttl_ms: u32,
    pub entry_ttl_ms: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        // Content never changes, so long TTLs are always correct.
        Self {
            attr_ttl_ms: 1000,
            entry_ttl_ms: 1000,
        }
    }
}

/// Ownership reported for every inode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerPolicy {
    pub uid: u32,
    pub gid: u32,
}

/// Mount options applied by the host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountPolicy {
    pub fs_name: String,
    pub allow_other: bool,
    pub allow_root: bool,
    pub auto_unmount: bool,
}

impl Default for MountPolicy {
    fn default() -> Self {
        Self {
            fs_name: "hellofs".to_string(),
            allow_other: false,
            allow_root: false,
            auto_unmount: false,
        }
    }
}

/// Top-level filesystem configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub cache: CachePolicy,
    /// When unset, the host reports the ids of the mounting process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerPolicy>,
    pub mount: MountPolicy,
    pub tree: TreeDescription,
}

impl FsConfig {
    /// Parse a JSON document; missing sections fall back to their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
