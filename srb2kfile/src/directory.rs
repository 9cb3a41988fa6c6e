//! A folder tree over the entry names of an archive.
//!
//! The tree is built in one go from the complete list of entry paths. Nodes
//! live in a single arena and are indexed by their full path, so a path that
//! is referenced many times always resolves to the same node.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;

const SEPARATOR: char = '/';
const ROOT: NodeId = NodeId(0);

/// Index of a node in its [`DirectoryTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct NodeData {
    name: String,
    full_path: String,
    /// In insertion order, names are unique
    children: Vec<NodeId>,
}

pub struct DirectoryTree {
    nodes: Vec<NodeData>,
    by_path: HashMap<String, NodeId>,
}

impl fmt::Debug for DirectoryTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\nDirectoryTree {{\n  nodes: {},\n}}", self.nodes.len())
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{}{}{}", parent, SEPARATOR, name)
    }
}

impl DirectoryTree {
    fn empty() -> Self {
        let root = NodeData {
            name: String::new(),
            full_path: String::new(),
            children: Vec::new(),
        };
        DirectoryTree {
            nodes: vec![root],
            by_path: HashMap::from([(String::new(), ROOT)]),
        }
    }

    /// Build a tree from hierarchical paths (`Graphics/MAPGTP`). Empty
    /// segments, such as from a trailing slash, are skipped.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::empty();
        for path in paths {
            tree.insert_path(path.as_ref());
        }
        tree
    }

    /// Build a flat tree where every name is a single child of the root
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::empty();
        for name in names {
            let name = name.as_ref();
            if !name.is_empty() {
                tree.insert_child(ROOT, name);
            }
        }
        tree
    }

    fn insert_path(&mut self, path: &str) -> NodeId {
        path.split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .fold(ROOT, |node, name| self.insert_child(node, name))
    }

    fn insert_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let full_path = join(&self.nodes[parent.0].full_path, name);
        if let Some(id) = self.by_path.get(&full_path) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            name: name.to_owned(),
            full_path: full_path.clone(),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        self.by_path.insert(full_path, id);
        id
    }

    pub fn root(&self) -> Node<'_> {
        self.node(ROOT)
    }

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { tree: self, id }
    }

    /// Find a node by its full path, leading/trailing slashes ignored
    pub fn get(&self, path: &str) -> Option<Node<'_>> {
        let path = path.trim_matches(SEPARATOR);
        self.by_path.get(path).map(|id| self.node(*id))
    }

    /// Node count, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when only the root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}

/// A borrowed view of one node
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t DirectoryTree,
    id: NodeId,
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node({:?})", self.full_path())
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl<'t> Node<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The last path segment, empty for the root
    pub fn name(&self) -> &'t str {
        &self.data().name
    }

    /// Slash-joined names from the root, empty for the root
    pub fn full_path(&self) -> &'t str {
        &self.data().full_path
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT
    }

    /// Files are the leaves of the tree
    pub fn is_file(&self) -> bool {
        !self.is_root() && self.data().children.is_empty()
    }

    pub fn children(self) -> impl Iterator<Item = Node<'t>> {
        let tree = self.tree;
        self.data().children.iter().map(move |id| tree.node(*id))
    }

    /// The immediate child called exactly `name`
    pub fn lookup(self, name: &str) -> Option<Node<'t>> {
        if name.is_empty() || name.contains(SEPARATOR) {
            return None;
        }
        let path = join(self.full_path(), name);
        self.tree.by_path.get(&path).map(|id| self.tree.node(*id))
    }

    /// Every node below this one, depth first, in insertion order
    pub fn descendants(self) -> Descendants<'t> {
        let mut stack: Vec<NodeId> = self.data().children.clone();
        stack.reverse();
        Descendants {
            tree: self.tree,
            stack,
        }
    }

    /// Nodes below this one whose full path matches `pattern`. Each call
    /// walks the tree afresh.
    pub fn search(self, pattern: &Regex) -> impl Iterator<Item = Node<'t>> {
        self.descendants()
            .filter(move |node| pattern.is_match(node.full_path()))
    }

    /// Every file below this one
    pub fn all_files(self) -> impl Iterator<Item = Node<'t>> {
        self.descendants().filter(Node::is_file)
    }
}

pub struct Descendants<'t> {
    tree: &'t DirectoryTree,
    stack: Vec<NodeId>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        self.stack.extend(node.data().children.iter().rev());
        Some(node)
    }
}
