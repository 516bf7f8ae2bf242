// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::io::Write;

use hellofs_core::{
    build_dispatcher, FsConfig, FsError, InodeId, NodeKind, OwnerPolicy, SimulatedClock,
    TreeBuilder, TreeError,
};
use tempfile::NamedTempFile;

fn load(json: &str) -> FsConfig {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    let content = std::fs::read_to_string(file.path()).unwrap();
    FsConfig::from_json(&content).unwrap()
}

#[test]
fn serves_tree_from_config_file() {
    let config = load(
        r#"{
            "owner": { "uid": 42, "gid": 42 },
            "tree": {
                "root": 10,
                "nodes": [
                    { "id": 10, "dir": { "children": [
                        { "name": "etc", "id": 11 },
                        { "name": "README", "id": 13 }
                    ] } },
                    { "id": 11, "dir": { "children": [ { "name": "motd", "id": 12 } ] } },
                    { "id": 12, "file": { "content": "welcome\n", "size": 8 } },
                    { "id": 13, "file": { "content": "read me" } }
                ]
            }
        }"#,
    );

    let fs = build_dispatcher(&config, &SimulatedClock::default(), OwnerPolicy { uid: 0, gid: 0 })
        .unwrap();
    assert_eq!(fs.root_id(), InodeId(10));

    let names: Vec<_> = fs.readdir(fs.root_id()).unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, ["etc", "README"]);

    let motd = fs.resolve_path("/etc/motd").unwrap();
    assert_eq!(motd, InodeId(12));
    let attr = fs.getattr(motd).unwrap();
    assert_eq!(attr.kind, NodeKind::RegularFile);
    assert_eq!(attr.uid, 42);

    let fh = fs.open(motd).unwrap();
    let reply = fs.read(fh, 0, 64).unwrap();
    assert_eq!(reply.data, b"welcome\n");
    assert!(reply.eof);

    assert_eq!(fs.table().path_of(motd).unwrap(), "/etc/motd");
    assert_eq!(fs.lookup(InodeId(1), "etc"), Err(FsError::NotFound));
}

#[test]
fn invalid_tree_never_becomes_servable() {
    let config = load(
        r#"{ "tree": { "nodes": [
            { "id": 1, "dir": { "children": [ { "name": "f", "id": 2 } ] } },
            { "id": 2, "file": { "content": "abc", "size": 5 } }
        ] } }"#,
    );
    let err = build_dispatcher(&config, &SimulatedClock::default(), OwnerPolicy { uid: 0, gid: 0 })
        .unwrap_err();
    assert_eq!(
        err,
        TreeError::SizeMismatch {
            id: InodeId(2),
            declared: 5,
            actual: 3
        }
    );
}

#[test]
fn larger_builder_tree_keeps_insertion_order() {
    let mut builder = TreeBuilder::new();
    let root = builder.root();
    let docs = builder.dir(root, "docs");
    for name in ["zeta", "alpha", "mid"] {
        builder.file(docs, name, name);
    }
    let config = FsConfig {
        tree: builder.build(),
        ..FsConfig::default()
    };
    let fs = build_dispatcher(&config, &SimulatedClock::default(), OwnerPolicy { uid: 0, gid: 0 })
        .unwrap();

    let names: Vec<_> = fs.readdir(docs).unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, ["zeta", "alpha", "mid"]);
    assert_eq!(fs.getattr(docs).unwrap().nlink, 2);
}
