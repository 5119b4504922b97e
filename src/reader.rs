use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::block::DataBlock;
use crate::metadata::DatasetAttributes;

/// Read access to an N5 hierarchy.
///
/// Implemented by the tree-backed server side ([crate::router::TreeReader])
/// and by the remote proxy ([crate::client::GrpcReader]).
/// Missing paths are reported as `false`, empty or `None`, never as errors.
#[async_trait]
pub trait N5Reader: Send + Sync {
    /// Unstructured attributes at `path`; empty if there are none.
    async fn get_attributes(
        &self,
        path: &str,
    ) -> crate::Result<serde_json::Map<String, serde_json::Value>>;

    /// Attributes of the dataset at `path`, if there is one.
    async fn get_dataset_attributes(&self, path: &str) -> crate::Result<Option<DatasetAttributes>>;

    /// The block at `grid_position` of the dataset at `path`.
    ///
    /// `None` if there is no such dataset or block.
    async fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: &[u64],
    ) -> crate::Result<Option<DataBlock>>;

    async fn exists(&self, path: &str) -> crate::Result<bool>;

    async fn dataset_exists(&self, path: &str) -> crate::Result<bool>;

    /// Names of the immediate children of `path`.
    async fn list(&self, path: &str) -> crate::Result<Vec<String>>;
}

#[async_trait]
pub trait N5ReaderExt: N5Reader {
    /// Deserialize the attribute `key` at `path`.
    ///
    /// `None` if the key is absent or null.
    async fn get_attribute<T: DeserializeOwned + Send>(
        &self,
        path: &str,
        key: &str,
    ) -> crate::Result<Option<T>> {
        let mut attributes = self.get_attributes(path).await?;
        match attributes.remove(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }
}

impl<R: N5Reader + ?Sized> N5ReaderExt for R {}
