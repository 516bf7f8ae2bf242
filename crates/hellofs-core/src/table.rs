// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Immutable inode table
//!
//! The table is an arena keyed by [`InodeId`]; directories hold their children as
//! `(name, id)` lists in presentation order. It is built and validated once from a
//! [`TreeDescription`] and never mutated afterwards, which is what lets the dispatcher
//! share it across request threads without locking.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::OwnerPolicy;
use crate::error::{FsError, FsResult, TreeError};
use crate::tree::{is_valid_name, NodeBody, TreeDescription};
use crate::types::{Attributes, InodeId, NodeKind, DIR_MODE, FILE_MODE};

/// A named entry inside a directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirChild {
    pub name: String,
    pub id: InodeId,
}

/// Directory children or file bytes
#[derive(Clone, Debug)]
pub enum InodeData {
    Directory { children: Vec<DirChild> },
    File { content: Box<[u8]> },
}

/// One record of the table
#[derive(Clone, Debug)]
pub struct Inode {
    pub id: InodeId,
    /// Containing directory; the root is its own parent
    pub parent: InodeId,
    /// Name inside the parent; empty for the root
    pub name: String,
    pub data: InodeData,
    pub mode: u32,
    pub mtime: SystemTime,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
}

impl Inode {
    pub fn kind(&self) -> NodeKind {
        match self.data {
            InodeData::Directory { .. } => NodeKind::Directory,
            InodeData::File { .. } => NodeKind::RegularFile,
        }
    }

    pub fn size(&self) -> u64 {
        match &self.data {
            InodeData::Directory { .. } => 0,
            InodeData::File { content } => content.len() as u64,
        }
    }

    pub fn children(&self) -> Option<&[DirChild]> {
        match &self.data {
            InodeData::Directory { children } => Some(children),
            InodeData::File { .. } => None,
        }
    }

    pub fn content(&self) -> Option<&[u8]> {
        match &self.data {
            InodeData::Directory { .. } => None,
            InodeData::File { content } => Some(content),
        }
    }

    pub fn attributes(&self) -> Attributes {
        Attributes {
            id: self.id,
            kind: self.kind(),
            mode: self.mode,
            size: self.size(),
            mtime: self.mtime,
            nlink: self.nlink,
            uid: self.uid,
            gid: self.gid,
        }
    }
}

/// Validated, read-only mapping from inode id to record
#[derive(Debug)]
pub struct InodeTable {
    root: InodeId,
    inodes: HashMap<InodeId, Inode>,
}

impl InodeTable {
    /// Validate `desc` and build the table, stamping every inode with one clock reading
    pub fn build(
        desc: &TreeDescription,
        clock: &dyn Clock,
        owner: OwnerPolicy,
    ) -> Result<Self, TreeError> {
        let root = desc.root;

        let mut declared: HashMap<InodeId, &NodeBody> = HashMap::with_capacity(desc.nodes.len());
        for node in &desc.nodes {
            if node.id.0 == 0 {
                return Err(TreeError::ReservedId);
            }
            if declared.insert(node.id, &node.body).is_some() {
                return Err(TreeError::DuplicateId(node.id));
            }
        }

        match declared.get(&root) {
            None => return Err(TreeError::MissingRoot(root)),
            Some(NodeBody::File { .. }) => return Err(TreeError::RootNotDirectory(root)),
            Some(NodeBody::Dir { .. }) => {}
        }

        // child -> (parent, name)
        let mut links: HashMap<InodeId, (InodeId, &str)> = HashMap::new();
        for node in &desc.nodes {
            match &node.body {
                NodeBody::Dir { children } => {
                    let mut seen = HashSet::with_capacity(children.len());
                    for child in children {
                        if !is_valid_name(&child.name) {
                            return Err(TreeError::InvalidName {
                                parent: node.id,
                                name: child.name.clone(),
                            });
                        }
                        if !seen.insert(child.name.as_str()) {
                            return Err(TreeError::DuplicateName {
                                parent: node.id,
                                name: child.name.clone(),
                            });
                        }
                        if !declared.contains_key(&child.id) {
                            return Err(TreeError::DanglingChild {
                                parent: node.id,
                                child: child.id,
                            });
                        }
                        if child.id == root {
                            return Err(TreeError::RootIsChild(root));
                        }
                        let link = (node.id, child.name.as_str());
                        if let Some((first, _)) = links.insert(child.id, link) {
                            return Err(TreeError::SharedChild {
                                child: child.id,
                                first,
                                second: node.id,
                            });
                        }
                    }
                }
                NodeBody::File {
                    content,
                    size: Some(declared_size),
                } => {
                    let actual = content.as_bytes().len() as u64;
                    if *declared_size != actual {
                        return Err(TreeError::SizeMismatch {
                            id: node.id,
                            declared: *declared_size,
                            actual,
                        });
                    }
                }
                NodeBody::File { size: None, .. } => {}
            }
        }

        // With single parents and the root never a child, whatever is reachable is a tree;
        // anything left over is an orphan or sits on a detached cycle.
        let mut reachable = HashSet::with_capacity(declared.len());
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            reachable.insert(id);
            if let Some(NodeBody::Dir { children }) = declared.get(&id) {
                queue.extend(children.iter().map(|c| c.id));
            }
        }
        if let Some(orphan) = desc.nodes.iter().find(|n| !reachable.contains(&n.id)) {
            return Err(TreeError::Orphan(orphan.id));
        }

        let mtime = clock.now();
        let mut inodes = HashMap::with_capacity(desc.nodes.len());
        for node in &desc.nodes {
            let (parent, name) = match links.get(&node.id) {
                Some((parent, name)) => (*parent, name.to_string()),
                None => (root, String::new()),
            };
            let (data, mode, nlink) = match &node.body {
                NodeBody::Dir { children } => {
                    let subdirs = children
                        .iter()
                        .filter(|c| matches!(declared.get(&c.id), Some(NodeBody::Dir { .. })))
                        .count() as u32;
                    let children = children
                        .iter()
                        .map(|c| DirChild {
                            name: c.name.clone(),
                            id: c.id,
                        })
                        .collect();
                    (InodeData::Directory { children }, DIR_MODE, 2 + subdirs)
                }
                NodeBody::File { content, .. } => (
                    InodeData::File {
                        content: content.as_bytes().into(),
                    },
                    FILE_MODE,
                    1,
                ),
            };

            debug!(
                ino = node.id.0,
                parent = parent.0,
                name = %name,
                nlink,
                "registered inode"
            );
            inodes.insert(
                node.id,
                Inode {
                    id: node.id,
                    parent,
                    name,
                    data,
                    mode,
                    mtime,
                    nlink,
                    uid: owner.uid,
                    gid: owner.gid,
                },
            );
        }

        info!(root = root.0, inodes = inodes.len(), "inode table built");
        Ok(Self { root, inodes })
    }

    pub fn root_id(&self) -> InodeId {
        self.root
    }

    pub fn get(&self, id: InodeId) -> FsResult<&Inode> {
        self.inodes.get(&id).ok_or(FsError::NotFound)
    }

    pub fn len(&self) -> usize {
        self.inodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inodes.is_empty()
    }

    /// All inodes in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Inode> {
        let mut ids: Vec<_> = self.inodes.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().filter_map(move |id| self.inodes.get(&id))
    }

    /// Absolute path of `id`, rebuilt through parent links
    pub fn path_of(&self, id: InodeId) -> FsResult<String> {
        let mut parts = Vec::new();
        let mut current = self.get(id)?;
        while current.id != self.root {
            parts.push(current.name.as_str());
            current = self.get(current.parent)?;
        }
        parts.reverse();
        Ok(format!("/{}", parts.join("/")))
    }

    /// Total bytes of file content held in memory
    pub fn content_bytes(&self) -> u64 {
        self.inodes.values().map(Inode::size).sum()
    }
}
