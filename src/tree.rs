use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::metadata::DatasetAttributes;
use crate::source::BlockSource;

pub const SEPARATOR: char = '/';

/// Split a path into its names.
///
/// Empty names are dropped, so `""`, `"/"` and `"//"` all address the root.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

/// A dataset bound to the source of its blocks.
#[derive(Clone)]
pub struct Dataset {
    attributes: DatasetAttributes,
    source: Arc<dyn BlockSource>,
}

impl Dataset {
    pub fn new(attributes: DatasetAttributes, source: Arc<dyn BlockSource>) -> crate::Result<Self> {
        if source.data_type() != attributes.data_type() {
            return Err(crate::Error::configuration(format!(
                "source produces {} elements, dataset declares {}",
                source.data_type(),
                attributes.data_type()
            )));
        }
        Ok(Self { attributes, source })
    }

    pub fn attributes(&self) -> &DatasetAttributes {
        &self.attributes
    }

    pub fn source(&self) -> &Arc<dyn BlockSource> {
        &self.source
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// Datasets are equal if they share attributes and the same source instance.
impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes && Arc::ptr_eq(&self.source, &other.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group(BTreeMap<String, Node>),
    Dataset(Dataset),
}

/// A node of the hierarchy; the root is always a group.
///
/// Children are owned by their parent.
/// `parent` only records the name under which the node is attached,
/// and is cleared when the node is detached.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    parent: Option<String>,
    kind: NodeKind,
}

impl Default for Node {
    fn default() -> Self {
        Self::group()
    }
}

impl Node {
    pub fn group() -> Self {
        Self {
            parent: None,
            kind: NodeKind::Group(BTreeMap::new()),
        }
    }

    pub fn dataset(dataset: Dataset) -> Self {
        Self {
            parent: None,
            kind: NodeKind::Dataset(dataset),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match &self.kind {
            NodeKind::Dataset(d) => Some(d),
            NodeKind::Group(_) => None,
        }
    }

    pub fn is_dataset(&self) -> bool {
        self.as_dataset().is_some()
    }

    /// Name this node is attached under, if attached.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        match &self.kind {
            NodeKind::Group(children) => children.get(name),
            NodeKind::Dataset(_) => None,
        }
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        match &mut self.kind {
            NodeKind::Group(children) => children.get_mut(name),
            NodeKind::Dataset(_) => None,
        }
    }

    /// Names of the immediate children, sorted.
    pub fn list_children(&self) -> Vec<String> {
        match &self.kind {
            NodeKind::Group(children) => children.keys().cloned().collect(),
            NodeKind::Dataset(_) => Vec::new(),
        }
    }

    /// Attach `node` under `name`.
    ///
    /// A child already attached under `name` is detached and returned.
    /// Fails if this node is a dataset.
    pub fn add_child(&mut self, name: &str, mut node: Node) -> crate::Result<Option<Node>> {
        let NodeKind::Group(children) = &mut self.kind else {
            return Err(crate::Error::general(format!(
                "cannot add child {name:?} to a dataset"
            )));
        };
        let replaced = children.remove(name).map(Node::detached);
        node.parent = Some(name.to_string());
        children.insert(name.to_string(), node);
        Ok(replaced)
    }

    /// Detach and return the child called `name`.
    pub fn remove_child(&mut self, name: &str) -> Option<Node> {
        let NodeKind::Group(children) = &mut self.kind else {
            return None;
        };
        children.remove(name).map(Node::detached)
    }

    fn detached(mut self) -> Self {
        self.parent = None;
        self
    }

    /// Look up the node at `path` relative to this node.
    pub fn resolve(&self, path: &str) -> Option<&Node> {
        split_path(path).try_fold(self, |node, name| node.child(name))
    }

    /// Create the node at `path`, with groups for any missing intermediate names.
    ///
    /// With a dataset the leaf is replaced by it.
    /// Without, an existing group leaf is kept as is and anything else is
    /// replaced by an empty group.
    /// Fails if an intermediate name is a dataset, or `path` is the root.
    pub fn insert(&mut self, path: &str, dataset: Option<Dataset>) -> crate::Result<()> {
        let names: Vec<&str> = split_path(path).collect();
        let Some((leaf, parents)) = names.split_last() else {
            return Err(crate::Error::general("cannot replace the root node"));
        };
        let mut current = self;
        for &name in parents {
            if current.child(name).is_none() {
                current.add_child(name, Node::group())?;
            }
            current = current
                .child_mut(name)
                .ok_or_else(|| crate::Error::general(format!("{name:?} is a dataset")))?;
            if current.is_dataset() {
                return Err(crate::Error::general(format!(
                    "cannot create {path:?} below dataset {name:?}"
                )));
            }
        }
        match dataset {
            Some(d) => {
                current.add_child(leaf, Node::dataset(d))?;
            }
            None => {
                if current.child(leaf).is_none_or(Node::is_dataset) {
                    current.add_child(leaf, Node::group())?;
                }
            }
        }
        Ok(())
    }
}
