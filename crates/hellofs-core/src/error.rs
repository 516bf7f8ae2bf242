// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for hellofs core

use crate::types::InodeId;

/// Errors returned by dispatcher operations
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("no such file or directory")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("bad file handle")]
    InvalidHandle,
}

pub type FsResult<T> = Result<T, FsError>;

/// Reasons a tree description cannot become an inode table.
///
/// All of these are fatal: a table is either fully valid or never built.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("inode id 0 is reserved")]
    ReservedId,
    #[error("inode {0} declared more than once")]
    DuplicateId(InodeId),
    #[error("root inode {0} is not declared")]
    MissingRoot(InodeId),
    #[error("root inode {0} is not a directory")]
    RootNotDirectory(InodeId),
    #[error("directory {parent} has two entries named {name:?}")]
    DuplicateName { parent: InodeId, name: String },
    #[error("directory {parent} has an invalid entry name {name:?}")]
    InvalidName { parent: InodeId, name: String },
    #[error("directory {parent} references undeclared inode {child}")]
    DanglingChild { parent: InodeId, child: InodeId },
    #[error("inode {child} is linked from both {first} and {second}")]
    SharedChild {
        child: InodeId,
        first: InodeId,
        second: InodeId,
    },
    #[error("root inode {0} appears as a child")]
    RootIsChild(InodeId),
    #[error("inode {0} is not reachable from the root")]
    Orphan(InodeId),
    #[error("file {id} declares {declared} bytes but holds {actual}")]
    SizeMismatch {
        id: InodeId,
        declared: u64,
        actual: u64,
    },
}

impl From<FsError> for std::io::Error {
    fn from(err: FsError) -> Self {
        let kind = match err {
            FsError::NotFound => std::io::ErrorKind::NotFound,
            FsError::InvalidHandle => std::io::ErrorKind::InvalidInput,
            FsError::NotADirectory => std::io::ErrorKind::NotADirectory,
            FsError::IsADirectory => std::io::ErrorKind::IsADirectory,
        };
        std::io::Error::new(kind, err)
    }
}
