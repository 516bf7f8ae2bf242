// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Caller-side sequential access over a dispatcher handle
//!
//! The dispatcher only offers positional reads. `FileCursor` keeps its own position so
//! callers can use `std::io::Read` and `std::io::Seek`; seeking never influences
//! [`FileCursor::read_at`].

use std::io::{self, Read, Seek, SeekFrom};

use crate::dispatcher::Dispatcher;
use crate::error::FsResult;
use crate::types::{HandleId, InodeId};

pub struct FileCursor<'a> {
    fs: &'a Dispatcher,
    handle: HandleId,
    size: u64,
    pos: u64,
}

impl<'a> FileCursor<'a> {
    /// Open `id` and position the cursor at its start
    pub fn open(fs: &'a Dispatcher, id: InodeId) -> FsResult<Self> {
        let handle = fs.open(id)?;
        let size = fs.getattr_handle(handle)?.size;
        Ok(Self {
            fs,
            handle,
            size,
            pos: 0,
        })
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Copy bytes at `offset` into `buf`; returns the count and whether end-of-file was hit
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> FsResult<(usize, bool)> {
        let reply = self.fs.read(self.handle, offset, buf.len())?;
        buf[..reply.len()].copy_from_slice(reply.data);
        Ok((reply.len(), reply.eof))
    }
}

impl Read for FileCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (n, _) = self.read_at(buf, self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for FileCursor<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(off) => Some(off),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        match target {
            Some(off) => {
                self.pos = off;
                Ok(off)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}

impl Drop for FileCursor<'_> {
    fn drop(&mut self) {
        self.fs.release(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulatedClock;
    use crate::config::OwnerPolicy;
    use crate::error::FsError;
    use crate::table::InodeTable;
    use crate::tree::TreeDescription;
    use std::sync::Arc;

    fn hello() -> Dispatcher {
        let table = InodeTable::build(
            &TreeDescription::hello_world(),
            &SimulatedClock::default(),
            OwnerPolicy { uid: 0, gid: 0 },
        )
        .expect("hello tree is valid");
        Dispatcher::new(Arc::new(table))
    }

    #[test]
    fn read_to_end_collects_content() {
        let fs = hello();
        let id = fs.resolve_path("/hello").unwrap();
        let mut cursor = FileCursor::open(&fs, id).unwrap();
        let mut out = String::new();
        cursor.read_to_string(&mut out).unwrap();
        assert_eq!(out, "Hello, world!");
        assert_eq!(cursor.position(), 13);
    }

    #[test]
    fn seek_variants() {
        let fs = hello();
        let id = fs.resolve_path("/hello").unwrap();
        let mut cursor = FileCursor::open(&fs, id).unwrap();

        assert_eq!(cursor.seek(SeekFrom::End(-6)).unwrap(), 7);
        assert_eq!(cursor.seek(SeekFrom::Current(-4)).unwrap(), 3);
        assert!(cursor.seek(SeekFrom::Current(-4)).is_err());
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.seek(SeekFrom::Start(100)).unwrap(), 100);

        let mut buf = [0u8; 4];
        assert_eq!(cursor.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn drop_releases_handle() {
        let fs = hello();
        let id = fs.resolve_path("/dir/world").unwrap();
        let handle = {
            let cursor = FileCursor::open(&fs, id).unwrap();
            assert_eq!(fs.stats().open_handles, 1);
            cursor.handle()
        };
        assert_eq!(fs.stats().open_handles, 0);
        assert_eq!(fs.read(handle, 0, 1), Err(FsError::InvalidHandle));
    }

    #[test]
    fn opening_directory_fails() {
        let fs = hello();
        let dir = fs.resolve_path("/dir").unwrap();
        assert!(matches!(FileCursor::open(&fs, dir), Err(FsError::IsADirectory)));
    }
}
