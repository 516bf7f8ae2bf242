// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! hellofs FUSE adapter implementation
//!
//! Maps FUSE requests onto the five dispatcher entry points. Inode numbers are the table's
//! ids unchanged, so the table root must be `FUSE_ROOT_ID`.

#[cfg(not(all(feature = "fuse", target_os = "linux")))]
compile_error!("This module requires the 'fuse' feature on Linux");

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use fuser::{
    FileAttr, FileType, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen,
    ReplyStatfs, Request, FUSE_ROOT_ID,
};
use hellofs_core::{
    Attributes, CachePolicy, Dispatcher, FsError, HandleId, InodeId, NodeKind, NAME_MAX,
};
use libc::{c_int, ENOTDIR};
use tracing::{debug, info, warn};

use crate::errno::{component_name, errno, request_offset};

/// Block size reported in attributes and statfs
const BLOCK_SIZE: u32 = 512;

/// hellofs FUSE filesystem adapter
pub struct HelloFsFuse {
    fs: Arc<Dispatcher>,
    /// TTL for attribute cache responses
    attr_ttl: Duration,
    /// TTL for directory entry cache responses
    entry_ttl: Duration,
}

impl HelloFsFuse {
    pub fn new(fs: Arc<Dispatcher>, cache: &CachePolicy) -> anyhow::Result<Self> {
        anyhow::ensure!(
            fs.root_id().as_u64() == FUSE_ROOT_ID,
            "tree root must be inode {} to be mounted, got {}",
            FUSE_ROOT_ID,
            fs.root_id()
        );
        Ok(Self {
            fs,
            attr_ttl: Duration::from_millis(cache.attr_ttl_ms as u64),
            entry_ttl: Duration::from_millis(cache.entry_ttl_ms as u64),
        })
    }

    /// Convert core Attributes to FUSE FileAttr
    fn attr_to_fuse(attr: &Attributes) -> FileAttr {
        let kind = match attr.kind {
            NodeKind::Directory => FileType::Directory,
            NodeKind::RegularFile => FileType::RegularFile,
        };

        FileAttr {
            ino: attr.id.as_u64(),
            size: attr.size,
            blocks: attr.size.div_ceil(BLOCK_SIZE as u64),
            atime: attr.mtime,
            mtime: attr.mtime,
            ctime: attr.mtime,
            crtime: attr.mtime,
            kind,
            perm: (attr.mode & 0o7777) as u16,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    fn reply_error(op: &str, ino: u64, err: FsError) -> c_int {
        debug!(op, ino, error = %err, "request failed");
        errno(err)
    }
}

impl fuser::Filesystem for HelloFsFuse {
    fn init(&mut self, _req: &Request, _config: &mut fuser::KernelConfig) -> Result<(), c_int> {
        let stats = self.fs.stats();
        info!(
            inodes = stats.inodes,
            content_bytes = stats.content_bytes,
            attr_ttl_ms = self.attr_ttl.as_millis() as u64,
            entry_ttl_ms = self.entry_ttl.as_millis() as u64,
            "hellofs FUSE adapter initialized"
        );
        Ok(())
    }

    fn destroy(&mut self) {
        let open = self.fs.stats().open_handles;
        if open > 0 {
            warn!(open_handles = open, "unmounting with handles still open");
        }
        info!("hellofs FUSE adapter destroyed");
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = match component_name(name) {
            Ok(name) => name,
            Err(code) => {
                debug!(parent, name = ?name, code, "lookup rejected name");
                reply.error(code);
                return;
            }
        };

        match self.fs.lookup_attr(InodeId(parent), name) {
            Ok(attr) => {
                debug!(parent, name, ino = attr.id.as_u64(), "lookup");
                reply.entry(&self.entry_ttl, &Self::attr_to_fuse(&attr), 0);
            }
            Err(err) => reply.error(Self::reply_error("lookup", parent, err)),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, fh: Option<u64>, reply: ReplyAttr) {
        let result = match fh {
            Some(fh) => self.fs.getattr_handle(HandleId(fh)),
            None => self.fs.getattr(InodeId(ino)),
        };
        match result {
            Ok(attr) => reply.attr(&self.attr_ttl, &Self::attr_to_fuse(&attr)),
            Err(err) => reply.error(Self::reply_error("getattr", ino, err)),
        }
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        let stats = self.fs.stats();
        let blocks = stats.content_bytes.div_ceil(BLOCK_SIZE as u64);
        reply.statfs(
            blocks,
            0,
            0,
            stats.inodes,
            0,
            BLOCK_SIZE,
            NAME_MAX as u32,
            BLOCK_SIZE,
        );
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.fs.getattr(InodeId(ino)) {
            Ok(attr) if attr.is_dir() => reply.opened(0, 0),
            Ok(_) => reply.error(ENOTDIR),
            Err(err) => reply.error(Self::reply_error("opendir", ino, err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let offset = match request_offset(offset) {
            Ok(offset) => offset,
            Err(code) => {
                reply.error(code);
                return;
            }
        };

        match self.fs.readdir_from(InodeId(ino), offset) {
            Ok(entries) => {
                for (cookie, entry) in entries {
                    let file_type = match entry.kind {
                        NodeKind::Directory => FileType::Directory,
                        NodeKind::RegularFile => FileType::RegularFile,
                    };
                    // A full buffer ends this batch; the kernel resumes from the last cookie.
                    if reply.add(entry.id.as_u64(), cookie as i64, file_type, &entry.name) {
                        break;
                    }
                }
                reply.ok();
            }
            Err(err) => reply.error(Self::reply_error("readdir", ino, err)),
        }
    }

    fn releasedir(&mut self, _req: &Request, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn open(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.fs.open(InodeId(ino)) {
            Ok(handle) => {
                debug!(ino, fh = handle.0, "open");
                reply.opened(handle.0, 0);
            }
            Err(err) => reply.error(Self::reply_error("open", ino, err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let offset = match request_offset(offset) {
            Ok(offset) => offset,
            Err(code) => {
                reply.error(code);
                return;
            }
        };

        match self.fs.read(HandleId(fh), offset, size as usize) {
            Ok(data) => {
                // FUSE signals end-of-file through the short reply itself.
                debug!(ino, fh, offset, size, returned = data.len(), eof = data.eof, "read");
                reply.data(data.data);
            }
            Err(FsError::InvalidHandle) => {
                warn!(ino, fh, "read on unknown handle");
                reply.error(errno(FsError::InvalidHandle));
            }
            Err(err) => reply.error(Self::reply_error("read", ino, err)),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        if !self.fs.release(HandleId(fh)) {
            debug!(ino, fh, "release of a handle that was not open");
        }
        reply.ok();
    }

    fn access(&mut self, _req: &Request, ino: u64, _mask: i32, reply: ReplyEmpty) {
        match self.fs.getattr(InodeId(ino)) {
            Ok(_) => reply.ok(),
            Err(err) => reply.error(Self::reply_error("access", ino, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hellofs_core::{build_dispatcher, FsConfig, OwnerPolicy, SimulatedClock};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn dispatcher(config: &FsConfig) -> Arc<Dispatcher> {
        let clock = SimulatedClock::new(UNIX_EPOCH + Duration::from_secs(1_000));
        Arc::new(build_dispatcher(config, &clock, OwnerPolicy { uid: 7, gid: 8 }).unwrap())
    }

    #[test]
    fn cache_ttls_follow_config() {
        let mut config = FsConfig::default();
        config.cache.attr_ttl_ms = 1500;
        config.cache.entry_ttl_ms = 2500;

        let fuse = HelloFsFuse::new(dispatcher(&config), &config.cache).expect("fuse init");
        assert_eq!(fuse.attr_ttl, Duration::from_millis(1500));
        assert_eq!(fuse.entry_ttl, Duration::from_millis(2500));
    }

    #[test]
    fn rejects_tree_rooted_elsewhere() {
        let mut config = FsConfig::default();
        config.tree = serde_json::from_str(r#"{ "root": 9, "nodes": [ { "id": 9, "dir": {} } ] }"#)
            .unwrap();

        assert!(HelloFsFuse::new(dispatcher(&config), &config.cache).is_err());
    }

    #[test]
    fn file_attr_conversion() {
        let fs = dispatcher(&FsConfig::default());

        let root = HelloFsFuse::attr_to_fuse(&fs.getattr(fs.root_id()).unwrap());
        assert_eq!(root.ino, FUSE_ROOT_ID);
        assert_eq!(root.kind, FileType::Directory);
        assert_eq!(root.perm, 0o500);
        assert_eq!(root.size, 0);
        assert_eq!(root.nlink, 3);

        let hello = fs.resolve_path("/hello").unwrap();
        let attr = HelloFsFuse::attr_to_fuse(&fs.getattr(hello).unwrap());
        assert_eq!(attr.kind, FileType::RegularFile);
        assert_eq!(attr.perm, 0o400);
        assert_eq!(attr.size, 13);
        assert_eq!(attr.blocks, 1);
        assert_eq!((attr.uid, attr.gid), (7, 8));
        assert_eq!(attr.mtime, SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
    }
}
