use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tonic::transport::{Channel, Endpoint};

use crate::block::DataBlock;
use crate::config::ClientConfig;
use crate::metadata::DatasetAttributes;
use crate::proto;
use crate::proto::n5_service_client::N5ServiceClient;
use crate::reader::N5Reader;
use crate::wire;

/// [N5Reader] forwarding every call to a remote N5 gRPC server.
///
/// A failed call is returned as [crate::Error::Rpc] or [crate::Error::Transport];
/// only the server's explicit answers are reported as absence.
#[derive(Debug, Clone)]
pub struct GrpcReader {
    client: N5ServiceClient<Channel>,
}

impl GrpcReader {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: N5ServiceClient::new(channel),
        }
    }

    /// Connect to `target`, e.g. `http://localhost:9090`.
    pub async fn connect(target: impl Into<String>) -> crate::Result<Self> {
        let target = target.into();
        let endpoint = Endpoint::from_shared(target.clone())
            .map_err(|e| crate::Error::configuration(format!("invalid target {target:?}: {e}")))?;
        let channel = endpoint.connect().await?;
        Ok(Self::new(channel))
    }

    pub async fn health_check(&self) -> crate::Result<proto::ServingStatus> {
        let response = self
            .client
            .clone()
            .health_check(proto::HealthRequest {})
            .await?
            .into_inner();
        Ok(proto::ServingStatus::try_from(response.status).unwrap_or(proto::ServingStatus::Unknown))
    }
}

#[async_trait]
impl N5Reader for GrpcReader {
    async fn get_attributes(
        &self,
        path: &str,
    ) -> crate::Result<serde_json::Map<String, serde_json::Value>> {
        let response = self
            .client
            .clone()
            .get_attributes(wire::path_message(path))
            .await?
            .into_inner();
        Ok(serde_json::from_str(&response.json_string)?)
    }

    async fn get_dataset_attributes(&self, path: &str) -> crate::Result<Option<DatasetAttributes>> {
        let response = self
            .client
            .clone()
            .get_dataset_attributes(wire::path_message(path))
            .await?
            .into_inner();
        wire::decode_nullable_attributes(response)
    }

    async fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: &[u64],
    ) -> crate::Result<Option<DataBlock>> {
        let meta = proto::BlockMeta {
            path: Some(wire::path_message(path)),
            grid_position: wire::encode_grid_position(grid_position)?,
            dataset_attributes: Some(wire::encode_attributes(attributes)?),
        };
        log::debug!("read_block {path:?} at {grid_position:?}");
        let response = self.client.clone().read_block(meta).await?.into_inner();
        wire::decode_nullable_block(response, Some(attributes), grid_position)
    }

    async fn exists(&self, path: &str) -> crate::Result<bool> {
        let response = self
            .client
            .clone()
            .exists(wire::path_message(path))
            .await?;
        Ok(response.into_inner().flag)
    }

    async fn dataset_exists(&self, path: &str) -> crate::Result<bool> {
        let response = self
            .client
            .clone()
            .dataset_exists(wire::path_message(path))
            .await?;
        Ok(response.into_inner().flag)
    }

    async fn list(&self, path: &str) -> crate::Result<Vec<String>> {
        let response = self
            .client
            .clone()
            .list(wire::path_message(path))
            .await?;
        Ok(response
            .into_inner()
            .paths
            .into_iter()
            .map(|p| p.path_name)
            .collect())
    }
}

const MAX_IN_FLIGHT: u32 = 1 << 16;

/// [GrpcReader] owning its connection.
///
/// [ClosableGrpcReader::close] waits for calls in flight, up to the configured
/// timeout, and releases the connection; later calls fail with
/// [crate::Error::Closed].
#[derive(Debug)]
pub struct ClosableGrpcReader {
    inner: RwLock<Option<GrpcReader>>,
    closed: AtomicBool,
    in_flight: Arc<Semaphore>,
    shutdown_timeout: Duration,
}

impl ClosableGrpcReader {
    pub async fn connect(config: &ClientConfig) -> crate::Result<Self> {
        let reader = GrpcReader::connect(config.target.clone()).await?;
        Ok(Self {
            inner: RwLock::new(Some(reader)),
            closed: AtomicBool::new(false),
            in_flight: Arc::new(Semaphore::new(MAX_IN_FLIGHT as usize)),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// True once [ClosableGrpcReader::close] has started.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Check out the reader for one call.
    async fn checkout(&self) -> crate::Result<(GrpcReader, OwnedSemaphorePermit)> {
        if self.is_closed() {
            return Err(crate::Error::Closed);
        }
        let permit = self
            .in_flight
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| crate::Error::Closed)?;
        let reader = self.inner.read().await.clone().ok_or(crate::Error::Closed)?;
        Ok((reader, permit))
    }

    pub async fn health_check(&self) -> crate::Result<proto::ServingStatus> {
        let (reader, _permit) = self.checkout().await?;
        reader.health_check().await
    }

    /// Release the connection.
    ///
    /// Closing an already closed reader does nothing.
    pub async fn close(&self) -> crate::Result<()> {
        let taken = {
            let mut inner = self.inner.write().await;
            self.closed.store(true, Ordering::Release);
            inner.take()
        };
        let Some(reader) = taken else {
            return Ok(());
        };
        drop(reader);
        match tokio::time::timeout(
            self.shutdown_timeout,
            self.in_flight.acquire_many(MAX_IN_FLIGHT),
        )
        .await
        {
            Ok(Ok(permits)) => permits.forget(),
            Ok(Err(_)) => {}
            Err(_) => log::warn!(
                "calls still in flight after {:?}; closing anyway",
                self.shutdown_timeout
            ),
        }
        self.in_flight.close();
        Ok(())
    }
}

#[async_trait]
impl N5Reader for ClosableGrpcReader {
    async fn get_attributes(
        &self,
        path: &str,
    ) -> crate::Result<serde_json::Map<String, serde_json::Value>> {
        let (reader, _permit) = self.checkout().await?;
        reader.get_attributes(path).await
    }

    async fn get_dataset_attributes(&self, path: &str) -> crate::Result<Option<DatasetAttributes>> {
        let (reader, _permit) = self.checkout().await?;
        reader.get_dataset_attributes(path).await
    }

    async fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: &[u64],
    ) -> crate::Result<Option<DataBlock>> {
        let (reader, _permit) = self.checkout().await?;
        reader.read_block(path, attributes, grid_position).await
    }

    async fn exists(&self, path: &str) -> crate::Result<bool> {
        let (reader, _permit) = self.checkout().await?;
        reader.exists(path).await
    }

    async fn dataset_exists(&self, path: &str) -> crate::Result<bool> {
        let (reader, _permit) = self.checkout().await?;
        reader.dataset_exists(path).await
    }

    async fn list(&self, path: &str) -> crate::Result<Vec<String>> {
        let (reader, _permit) = self.checkout().await?;
        reader.list(path).await
    }
}
