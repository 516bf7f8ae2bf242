// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Translation of core errors into kernel error numbers

use std::ffi::OsStr;

use hellofs_core::{FsError, NAME_MAX};
use libc::{c_int, EBADF, EINVAL, EISDIR, ENAMETOOLONG, ENOENT, ENOTDIR};

pub fn errno(err: FsError) -> c_int {
    match err {
        FsError::NotFound => ENOENT,
        FsError::NotADirectory => ENOTDIR,
        FsError::IsADirectory => EISDIR,
        FsError::InvalidHandle => EBADF,
    }
}

/// Validate a path component handed to lookup
///
/// Over-long names fail with `ENAMETOOLONG`. Table names are UTF-8, so any other name
/// cannot match and fails with `ENOENT`.
pub fn component_name(name: &OsStr) -> Result<&str, c_int> {
    if name.len() > NAME_MAX {
        return Err(ENAMETOOLONG);
    }
    name.to_str().ok_or(errno(FsError::NotFound))
}

/// Kernel offsets are signed; negative ones are rejected with `EINVAL`
pub fn request_offset(offset: i64) -> Result<u64, c_int> {
    u64::try_from(offset).map_err(|_| EINVAL)
}
