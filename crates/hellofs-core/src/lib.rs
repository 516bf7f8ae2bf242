// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! hellofs core: a read-only, in-memory, inode-addressed filesystem
//!
//! An [`InodeTable`] is built once from a [`TreeDescription`] and then served by a
//! [`Dispatcher`] through lookup, getattr, readdir, open, read and release. Kernel
//! protocol adapters translate their requests into these calls.

pub mod clock;
pub mod config;
pub mod cursor;
pub mod dispatcher;
pub mod error;
pub mod table;
pub mod tree;
pub mod types;

use std::sync::Arc;

pub use clock::{Clock, SimulatedClock, SystemClock};
pub use config::{CachePolicy, FsConfig, MountPolicy, OwnerPolicy};
pub use cursor::FileCursor;
pub use dispatcher::Dispatcher;
pub use error::{FsError, FsResult, TreeError};
pub use table::{DirChild, Inode, InodeData, InodeTable};
pub use tree::{TreeBuilder, TreeDescription, HELLO_CONTENT, NAME_MAX};
pub use types::{
    Attributes, DirEntry, FsStats, HandleId, InodeId, NodeKind, ReadReply, DIR_MODE, FILE_MODE,
};

/// Build the table described by `config` and wrap it in a dispatcher
///
/// `fallback_owner` is used when the configuration does not pin ownership.
pub fn build_dispatcher(
    config: &FsConfig,
    clock: &dyn Clock,
    fallback_owner: OwnerPolicy,
) -> Result<Dispatcher, TreeError> {
    let owner = config.owner.unwrap_or(fallback_owner);
    let table = InodeTable::build(&config.tree, clock, owner)?;
    Ok(Dispatcher::new(Arc::new(table)))
}
