use std::sync::Arc;

use async_trait::async_trait;

use crate::block::DataBlock;
use crate::metadata::DatasetAttributes;
use crate::pool::WorkerPool;
use crate::reader::N5Reader;
use crate::tree::{Dataset, Node};

/// [N5Reader] over an in-memory [Node] hierarchy.
///
/// The hierarchy is frozen once the reader is built, so concurrent requests
/// only ever read it. Blocks are computed on the worker pool.
#[derive(Clone)]
pub struct TreeReader {
    root: Arc<Node>,
    pool: WorkerPool,
}

impl TreeReader {
    pub fn new(root: Node, pool: WorkerPool) -> Self {
        Self {
            root: Arc::new(root),
            pool,
        }
    }

    /// Build a hierarchy holding `datasets`; `None` entries create groups.
    pub fn from_datasets<'a>(
        datasets: impl IntoIterator<Item = (&'a str, Option<Dataset>)>,
        pool: WorkerPool,
    ) -> crate::Result<Self> {
        let mut root = Node::group();
        for (path, dataset) in datasets {
            root.insert(path, dataset)?;
        }
        Ok(Self::new(root, pool))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    fn dataset(&self, path: &str) -> Option<&Dataset> {
        self.root.resolve(path).and_then(Node::as_dataset)
    }
}

#[async_trait]
impl N5Reader for TreeReader {
    async fn get_attributes(
        &self,
        path: &str,
    ) -> crate::Result<serde_json::Map<String, serde_json::Value>> {
        Ok(self
            .dataset(path)
            .map(|d| d.source().attributes())
            .unwrap_or_default())
    }

    async fn get_dataset_attributes(&self, path: &str) -> crate::Result<Option<DatasetAttributes>> {
        Ok(self.dataset(path).map(|d| d.attributes().clone()))
    }

    /// The block is cut to the dataset's dimensions, as stored in the tree.
    ///
    /// Fails if `requested` names a different data type than the stored one.
    async fn read_block(
        &self,
        path: &str,
        requested: &DatasetAttributes,
        grid_position: &[u64],
    ) -> crate::Result<Option<DataBlock>> {
        let Some(dataset) = self.dataset(path) else {
            return Ok(None);
        };
        let attributes = dataset.attributes();
        if requested.data_type() != attributes.data_type() {
            return Err(crate::Error::configuration(format!(
                "{path:?} holds {}, not {}",
                attributes.data_type(),
                requested.data_type()
            )));
        }
        if grid_position.len() != attributes.num_dimensions() {
            return Err(crate::Error::format(format!(
                "grid position {grid_position:?} does not match {} dimensions of {path:?}",
                attributes.num_dimensions()
            )));
        }
        let Some((min, size)) = attributes.block_interval(grid_position) else {
            log::debug!("grid position {grid_position:?} is outside {path:?}");
            return Ok(None);
        };

        let source = dataset.source().clone();
        let data_type = attributes.data_type();
        let grid_position = grid_position.to_vec();
        let block = self
            .pool
            .run(move || {
                let data = source.read(&min, &size)?;
                DataBlock::new(size, grid_position, data_type, data)
            })
            .await?;
        Ok(Some(block))
    }

    async fn exists(&self, path: &str) -> crate::Result<bool> {
        Ok(self.root.resolve(path).is_some())
    }

    async fn dataset_exists(&self, path: &str) -> crate::Result<bool> {
        Ok(self.dataset(path).is_some())
    }

    async fn list(&self, path: &str) -> crate::Result<Vec<String>> {
        Ok(self
            .root
            .resolve(path)
            .map(Node::list_children)
            .unwrap_or_default())
    }
}
