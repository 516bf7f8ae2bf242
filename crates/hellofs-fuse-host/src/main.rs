// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! hellofs FUSE host
//!
//! Mounts the static hellofs tree read-only through libfuse. Without the `fuse` feature the
//! binary only builds and validates the tree, which is enough to check a configuration file.

#[cfg(all(feature = "fuse", target_os = "linux"))]
mod adapter;
#[cfg_attr(not(all(feature = "fuse", target_os = "linux")), allow(dead_code))]
mod errno;

#[cfg(all(feature = "fuse", target_os = "linux"))]
use adapter::HelloFsFuse;
use anyhow::{Context, Result};
use clap::Parser;
use hellofs_core::{build_dispatcher, FsConfig, OwnerPolicy, SystemClock};
use hellofs_logging::CliLoggingArgs;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(version, about = "Serve a static read-only tree over FUSE")]
struct Args {
    /// Mount point for the filesystem
    mount_point: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Allow other users to access the filesystem
    #[arg(long)]
    allow_other: bool,

    /// Allow root to access the filesystem
    #[arg(long)]
    allow_root: bool,

    /// Auto unmount on process exit
    #[arg(long)]
    auto_unmount: bool,

    #[command(flatten)]
    logging: CliLoggingArgs,
}

fn load_config(config_path: Option<PathBuf>) -> Result<FsConfig> {
    match config_path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config = FsConfig::from_json(&content)
                .with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(FsConfig::default()),
    }
}

/// Command-line switches only ever widen what the config file enables
fn apply_mount_flags(config: &mut FsConfig, args: &Args) {
    config.mount.allow_other |= args.allow_other;
    config.mount.allow_root |= args.allow_root;
    config.mount.auto_unmount |= args.auto_unmount;
}

fn process_owner() -> OwnerPolicy {
    // SAFETY: getuid and getgid cannot fail and touch no memory.
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
    OwnerPolicy { uid, gid }
}

fn main() -> Result<()> {
    let args = Args::parse();
    args.logging.clone().init(env!("CARGO_PKG_NAME"))?;

    info!(mount_point = %args.mount_point.display(), "starting hellofs FUSE host");

    let mut config = load_config(args.config.clone())?;
    apply_mount_flags(&mut config, &args);
    debug!(?config, "configuration loaded");

    let fs = Arc::new(
        build_dispatcher(&config, &SystemClock, process_owner()).context("building inode table")?,
    );
    info!(
        inodes = fs.table().len(),
        root = %fs.root_id(),
        "inode table ready"
    );

    #[cfg(all(feature = "fuse", target_os = "linux"))]
    {
        let filesystem = HelloFsFuse::new(Arc::clone(&fs), &config.cache)?;

        let mut mount_options = vec![
            fuser::MountOption::FSName(config.mount.fs_name.clone()),
            fuser::MountOption::Subtype("hellofs".to_string()),
            fuser::MountOption::RO,
            fuser::MountOption::NoExec,
        ];

        if config.mount.allow_other {
            mount_options.push(fuser::MountOption::AllowOther);
        }

        if config.mount.allow_root {
            mount_options.push(fuser::MountOption::AllowRoot);
        }

        if config.mount.auto_unmount {
            mount_options.push(fuser::MountOption::AutoUnmount);
        }

        info!(
            attr_ttl_ms = config.cache.attr_ttl_ms,
            entry_ttl_ms = config.cache.entry_ttl_ms,
            "mounting filesystem"
        );
        let session = fuser::spawn_mount2(filesystem, &args.mount_point, &mount_options)
            .with_context(|| format!("mounting at {}", args.mount_point.display()))?;
        info!("hellofs mounted; blocking until unmount");
        session.join();
    }

    #[cfg(not(all(feature = "fuse", target_os = "linux")))]
    {
        warn!("FUSE support not compiled in; the tree was validated but not mounted");
        for inode in fs.table().iter() {
            if let Ok(path) = fs.table().path_of(inode.id) {
                debug!(
                    ino = inode.id.as_u64(),
                    kind = ?inode.kind(),
                    size = inode.size(),
                    path,
                    "inode"
                );
            }
        }
        info!("To enable FUSE support, build with: cargo build --features fuse");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hellofs_core::{InodeId, HELLO_CONTENT};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn config_loading_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config, FsConfig::default());
        assert_eq!(config.tree.root, InodeId::ROOT);
    }

    #[test]
    fn config_loading_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_json = r#"{
            "cache": { "attr_ttl_ms": 500, "entry_ttl_ms": 250 },
            "owner": { "uid": 1000, "gid": 100 },
            "mount": { "fs_name": "greeting", "auto_unmount": true }
        }"#;
        temp_file.write_all(config_json.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(Some(temp_file.path().to_path_buf())).unwrap();
        assert_eq!(config.cache.attr_ttl_ms, 500);
        assert_eq!(config.cache.entry_ttl_ms, 250);
        assert_eq!(config.owner, Some(OwnerPolicy { uid: 1000, gid: 100 }));
        assert_eq!(config.mount.fs_name, "greeting");
        assert!(config.mount.auto_unmount);
        assert!(!config.mount.allow_other);

        let fs = build_dispatcher(&config, &SystemClock, process_owner()).unwrap();
        let hello = fs.resolve_path("/hello").unwrap();
        assert_eq!(fs.getattr(hello).unwrap().size, HELLO_CONTENT.len() as u64);
        assert_eq!(fs.getattr(hello).unwrap().uid, 1000);
    }

    #[test]
    fn config_loading_reports_bad_files() {
        let missing = load_config(Some(PathBuf::from("/nonexistent/hellofs.json")));
        assert!(missing.unwrap_err().to_string().contains("reading config"));

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"{ not json").unwrap();
        temp_file.flush().unwrap();
        let invalid = load_config(Some(temp_file.path().to_path_buf()));
        assert!(invalid.unwrap_err().to_string().contains("parsing config"));
    }

    #[test]
    fn cli_flags_widen_mount_policy() {
        let mut config = FsConfig::default();
        config.mount.allow_root = true;

        let args = parse(&["hellofs-fuse-host", "/mnt/hello", "--allow-other"]);
        apply_mount_flags(&mut config, &args);
        assert!(config.mount.allow_other);
        assert!(config.mount.allow_root);
        assert!(!config.mount.auto_unmount);
    }

    #[test]
    fn args_accept_logging_options() {
        let args = parse(&[
            "hellofs-fuse-host",
            "/mnt/hello",
            "--config",
            "hellofs.json",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ]);
        assert_eq!(args.mount_point, PathBuf::from("/mnt/hello"));
        assert_eq!(args.config, Some(PathBuf::from("hellofs.json")));
        assert_eq!(args.logging.log_level, Some(hellofs_logging::CliLogLevel::Debug));
        assert_eq!(args.logging.log_format, Some(hellofs_logging::LogFormat::Json));
    }

    #[test]
    fn mount_point_is_required() {
        assert!(Args::try_parse_from(["hellofs-fuse-host"]).is_err());
    }

    #[cfg(all(feature = "fuse", target_os = "linux"))]
    #[test]
    fn adapter_creation() {
        let config = FsConfig::default();
        let fs = Arc::new(build_dispatcher(&config, &SystemClock, process_owner()).unwrap());
        assert!(adapter::HelloFsFuse::new(fs, &config.cache).is_ok());
    }
}
