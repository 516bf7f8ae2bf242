// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Declarative tree descriptions
//!
//! A [`TreeDescription`] is the input to [`crate::InodeTable::build`]. It is a flat list of
//! node declarations linked by id, so it can be written by hand in a JSON config file or
//! assembled with [`TreeBuilder`]. Nothing here is validated; validation happens once, when
//! the table is built.

use serde::{Deserialize, Serialize};

use crate::types::InodeId;

/// Content shared by `/hello` and `/dir/world` in the default tree
pub const HELLO_CONTENT: &str = "Hello, world!";

/// Longest accepted single path component, in bytes
pub const NAME_MAX: usize = 255;

/// File content as written in a description
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(s) => s.as_bytes(),
            Content::Bytes(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Content::Text(s) => s.into_bytes(),
            Content::Bytes(b) => b,
        }
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Content {
    fn from(b: Vec<u8>) -> Self {
        Content::Bytes(b)
    }
}

/// A named link from a directory to a child node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRef {
    pub name: String,
    pub id: InodeId,
}

/// Directory or file payload of a declaration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeBody {
    Dir {
        #[serde(default)]
        children: Vec<ChildRef>,
    },
    File {
        content: Content,
        /// Declared length; checked against the content when present
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
    },
}

/// One node declaration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDecl {
    pub id: InodeId,
    #[serde(flatten)]
    pub body: NodeBody,
}

/// Complete description of a static tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDescription {
    #[serde(default = "default_root")]
    pub root: InodeId,
    pub nodes: Vec<NodeDecl>,
}

fn default_root() -> InodeId {
    InodeId::ROOT
}

impl TreeDescription {
    /// The four-inode tree: `/dir`, `/hello` and `/dir/world`
    pub fn hello_world() -> Self {
        let mut builder = TreeBuilder::new();
        let root = builder.root();
        let dir = builder.dir(root, "dir");
        builder.file(root, "hello", HELLO_CONTENT);
        builder.file(dir, "world", HELLO_CONTENT);
        builder.build()
    }
}

impl Default for TreeDescription {
    fn default() -> Self {
        Self::hello_world()
    }
}

/// Check that `name` is a single, non-special path component
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= NAME_MAX
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\0')
}

/// Incremental builder that assigns ids in declaration order
///
/// Children are listed in the order they are added. Adding under an id that is not a
/// directory leaves the new node unlinked, which the table rejects as an orphan.
#[derive(Debug)]
pub struct TreeBuilder {
    root: InodeId,
    nodes: Vec<NodeDecl>,
    next_id: u64,
}

impl TreeBuilder {
    pub fn new() -> Self {
        let root = InodeId::ROOT;
        Self {
            root,
            nodes: vec![NodeDecl {
                id: root,
                body: NodeBody::Dir {
                    children: Vec::new(),
                },
            }],
            next_id: root.0 + 1,
        }
    }

    pub fn root(&self) -> InodeId {
        self.root
    }

    /// Add a directory under `parent` and return its id
    pub fn dir(&mut self, parent: InodeId, name: &str) -> InodeId {
        self.add(
            parent,
            name,
            NodeBody::Dir {
                children: Vec::new(),
            },
        )
    }

    /// Add a file under `parent`; its declared size is taken from the content
    pub fn file(&mut self, parent: InodeId, name: &str, content: impl Into<Content>) -> InodeId {
        let content = content.into();
        let size = Some(content.as_bytes().len() as u64);
        self.add(parent, name, NodeBody::File { content, size })
    }

    fn add(&mut self, parent: InodeId, name: &str, body: NodeBody) -> InodeId {
        let id = InodeId(self.next_id);
        self.next_id += 1;

        if let Some(NodeDecl {
            body: NodeBody::Dir { children },
            ..
        }) = self.nodes.iter_mut().find(|n| n.id == parent)
        {
            children.push(ChildRef {
                name: name.to_string(),
                id,
            });
        }

        self.nodes.push(NodeDecl { id, body });
        id
    }

    pub fn build(self) -> TreeDescription {
        TreeDescription {
            root: self.root,
            nodes: self.nodes,
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_world_layout() {
        let desc = TreeDescription::hello_world();
        assert_eq!(desc.root, InodeId::ROOT);
        assert_eq!(desc.nodes.len(), 4);

        match &desc.nodes[0].body {
            NodeBody::Dir { children } => {
                let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, ["dir", "hello"]);
            }
            other => panic!("root should be a directory, got {:?}", other),
        }
    }

    #[test]
    fn builder_assigns_sequential_ids() {
        let mut builder = TreeBuilder::new();
        let root = builder.root();
        let a = builder.dir(root, "a");
        let b = builder.file(a, "b", "x");
        assert_eq!(a, InodeId(2));
        assert_eq!(b, InodeId(3));
    }

    #[test]
    fn parses_json_description() {
        let json = r#"{
            "nodes": [
                { "id": 1, "dir": { "children": [ { "name": "motd", "id": 2 } ] } },
                { "id": 2, "file": { "content": "hi\n", "size": 3 } },
                { "id": 3, "file": { "content": [0, 159, 146, 150] } }
            ]
        }"#;
        let desc: TreeDescription = serde_json::from_str(json).unwrap();
        assert_eq!(desc.root, InodeId::ROOT);
        assert_eq!(desc.nodes.len(), 3);
        match &desc.nodes[2].body {
            NodeBody::File { content, size } => {
                assert_eq!(content.as_bytes(), &[0, 159, 146, 150]);
                assert_eq!(*size, None);
            }
            other => panic!("expected file, got {:?}", other),
        }
    }

    #[test]
    fn name_rules() {
        assert!(is_valid_name("hello"));
        assert!(is_valid_name(".hidden"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("."));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("nul\0"));
        assert!(!is_valid_name(&"x".repeat(NAME_MAX + 1)));
    }
}
