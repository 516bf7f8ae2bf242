// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core type definitions for hellofs

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Inode identifier, stable for the lifetime of a table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InodeId(pub u64);

impl InodeId {
    /// Well-known root id; matches the FUSE root inode number.
    pub const ROOT: InodeId = InodeId(1);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle identifier issued by `open`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

impl HandleId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Node kinds served by the filesystem
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Directory,
    RegularFile,
}

impl NodeKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }
}

/// Permission bits for directories: owner read + execute
pub const DIR_MODE: u32 = 0o500;

/// Permission bits for regular files: owner read
pub const FILE_MODE: u32 = 0o400;

/// File attributes as stored on the inode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub id: InodeId,
    pub kind: NodeKind,
    pub mode: u32,
    pub size: u64,
    pub mtime: SystemTime,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
}

impl Attributes {
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Full `st_mode` value including the file type bits
    pub fn st_mode(&self) -> u32 {
        let type_bits = match self.kind {
            NodeKind::Directory => 0o040000,
            NodeKind::RegularFile => 0o100000,
        };
        type_bits | (self.mode & 0o7777)
    }
}

/// Directory entry information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub id: InodeId,
    pub kind: NodeKind,
}

/// Result of a positional read
///
/// `eof` is set whenever the returned slice ends at the end of the content and
/// fewer bytes than requested were available, including the empty case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadReply<'a> {
    pub data: &'a [u8],
    pub eof: bool,
}

impl ReadReply<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Filesystem statistics
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsStats {
    pub inodes: u64,
    pub open_handles: u64,
    pub content_bytes: u64,
}
