// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Request dispatcher for hellofs
//!
//! Every entry point is a synchronous lookup over the shared [`InodeTable`]. The only
//! mutable state is the handle registry: ids come from an atomic counter and the
//! handle → inode map sits behind an `RwLock` so concurrent reads share it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{FsError, FsResult};
use crate::table::{Inode, InodeTable};
use crate::types::{Attributes, DirEntry, FsStats, HandleId, InodeId, ReadReply};

/// Open file handle; content is referenced through the table, never copied
#[derive(Clone, Copy, Debug)]
struct Handle {
    ino: InodeId,
}

/// Serves lookup, getattr, readdir, open, read and release against one table
#[derive(Debug)]
pub struct Dispatcher {
    table: Arc<InodeTable>,
    handles: RwLock<HashMap<HandleId, Handle>>,
    next_handle_id: AtomicU64,
}

impl Dispatcher {
    pub fn new(table: Arc<InodeTable>) -> Self {
        Self {
            table,
            handles: RwLock::new(HashMap::new()),
            next_handle_id: AtomicU64::new(1),
        }
    }

    pub fn table(&self) -> &InodeTable {
        &self.table
    }

    pub fn root_id(&self) -> InodeId {
        self.table.root_id()
    }

    /// Resolve `name` inside directory `parent`
    pub fn lookup(&self, parent: InodeId, name: &str) -> FsResult<InodeId> {
        let children = self.table.get(parent)?.children().ok_or(FsError::NotFound)?;
        children
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .ok_or(FsError::NotFound)
    }

    /// Lookup followed by getattr on the child, as a kernel entry reply needs
    pub fn lookup_attr(&self, parent: InodeId, name: &str) -> FsResult<Attributes> {
        let id = self.lookup(parent, name)?;
        self.getattr(id)
    }

    pub fn getattr(&self, id: InodeId) -> FsResult<Attributes> {
        Ok(self.table.get(id)?.attributes())
    }

    /// Attributes of the inode behind an open handle
    pub fn getattr_handle(&self, handle: HandleId) -> FsResult<Attributes> {
        let ino = self.handle_inode(handle)?;
        self.getattr(ino)
    }

    /// Children of a directory in presentation order
    pub fn readdir(&self, id: InodeId) -> FsResult<Vec<DirEntry>> {
        let children = self.table.get(id)?.children().ok_or(FsError::NotADirectory)?;
        children
            .iter()
            .map(|c| {
                Ok(DirEntry {
                    name: c.name.clone(),
                    id: c.id,
                    kind: self.table.get(c.id)?.kind(),
                })
            })
            .collect()
    }

    /// `readdir` resumed after `offset` entries, each paired with the cookie that resumes
    /// after it
    pub fn readdir_from(&self, id: InodeId, offset: u64) -> FsResult<Vec<(u64, DirEntry)>> {
        let entries = self.readdir(id)?;
        Ok(entries
            .into_iter()
            .enumerate()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .map(|(i, entry)| (i as u64 + 1, entry))
            .collect())
    }

    pub fn open(&self, id: InodeId) -> FsResult<HandleId> {
        let inode = self.table.get(id)?;
        if inode.content().is_none() {
            return Err(FsError::IsADirectory);
        }

        let handle_id = HandleId(self.next_handle_id.fetch_add(1, Ordering::Relaxed));
        self.handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle_id, Handle { ino: id });
        Ok(handle_id)
    }

    /// Positional read; never moves any cursor
    ///
    /// Returns at most `len` bytes starting at `offset`. `eof` is raised when `offset` is at
    /// or past the end, and also when the range runs past the end and the reply is short.
    pub fn read(&self, handle: HandleId, offset: u64, len: usize) -> FsResult<ReadReply<'_>> {
        let ino = self.handle_inode(handle)?;
        let inode: &Inode = self.table.get(ino)?;
        let content = inode.content().ok_or(FsError::IsADirectory)?;

        let start = match usize::try_from(offset) {
            Ok(start) if start < content.len() => start,
            _ => {
                return Ok(ReadReply {
                    data: &[],
                    eof: true,
                })
            }
        };
        let available = content.len() - start;
        let count = len.min(available);
        Ok(ReadReply {
            data: &content[start..start + count],
            eof: len > available,
        })
    }

    /// Drop a handle; releasing an unknown or already released handle is a no-op.
    /// Returns whether a live handle was removed.
    pub fn release(&self, handle: HandleId) -> bool {
        self.handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle)
            .is_some()
    }

    /// Walk `path` from the root one component at a time
    ///
    /// Every component after the first must be resolved inside a directory, including `.`,
    /// `..` and the empty component of a doubled or trailing slash.
    pub fn resolve_path(&self, path: &str) -> FsResult<InodeId> {
        let mut current = self.table.root_id();
        for (i, component) in path.split('/').enumerate() {
            if i == 0 && component.is_empty() {
                continue;
            }
            match component {
                "" | "." | ".." => {
                    let inode = self.table.get(current)?;
                    if inode.children().is_none() {
                        return Err(FsError::NotFound);
                    }
                    if component == ".." {
                        current = inode.parent;
                    }
                }
                name => current = self.lookup(current, name)?,
            }
        }
        Ok(current)
    }

    pub fn stats(&self) -> FsStats {
        let open_handles =
            self.handles.read().unwrap_or_else(PoisonError::into_inner).len() as u64;
        FsStats {
            inodes: self.table.len() as u64,
            open_handles,
            content_bytes: self.table.content_bytes(),
        }
    }

    fn handle_inode(&self, handle: HandleId) -> FsResult<InodeId> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .map(|h| h.ino)
            .ok_or(FsError::InvalidHandle)
    }
}
