use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};

use crate::config::ServerConfig;
use crate::proto;
use crate::proto::n5_service_server::{N5Service, N5ServiceServer};
use crate::reader::N5Reader;
use crate::wire;

/// gRPC service answering every call from an [N5Reader].
pub struct N5GrpcService<R> {
    reader: Arc<R>,
}

impl<R: N5Reader + 'static> N5GrpcService<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Arc::new(reader),
        }
    }

    pub fn into_server(self) -> N5ServiceServer<Self> {
        N5ServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl<R: N5Reader + 'static> N5Service for N5GrpcService<R> {
    async fn get_attributes(
        &self,
        request: Request<proto::Path>,
    ) -> Result<Response<proto::JsonString>, Status> {
        let path = request.into_inner().path_name;
        log::debug!("get_attributes {path:?}");
        let attributes = self.reader.get_attributes(&path).await?;
        let json_string = serde_json::to_string(&attributes).map_err(crate::Error::from)?;
        Ok(Response::new(proto::JsonString { json_string }))
    }

    async fn get_dataset_attributes(
        &self,
        request: Request<proto::Path>,
    ) -> Result<Response<proto::NullableDatasetAttributes>, Status> {
        let path = request.into_inner().path_name;
        log::debug!("get_dataset_attributes {path:?}");
        let attributes = self.reader.get_dataset_attributes(&path).await?;
        Ok(Response::new(wire::encode_nullable_attributes(
            attributes.as_ref(),
        )?))
    }

    async fn read_block(
        &self,
        request: Request<proto::BlockMeta>,
    ) -> Result<Response<proto::NullableBlock>, Status> {
        let meta = request.into_inner();
        let path = meta.path.map(|p| p.path_name).unwrap_or_default();
        let attributes = meta
            .dataset_attributes
            .ok_or_else(|| Status::invalid_argument("block request carries no dataset attributes"))?;
        let attributes = wire::decode_attributes(attributes)?;
        let grid_position = wire::decode_grid_position(&meta.grid_position)?;
        log::debug!("read_block {path:?} at {grid_position:?}");

        let block = self
            .reader
            .read_block(&path, &attributes, &grid_position)
            .await?;
        Ok(Response::new(wire::encode_nullable_block(
            block.as_ref(),
            Some(&attributes),
        )?))
    }

    async fn exists(
        &self,
        request: Request<proto::Path>,
    ) -> Result<Response<proto::BooleanFlag>, Status> {
        let path = request.into_inner().path_name;
        let flag = self.reader.exists(&path).await?;
        log::debug!("exists {path:?}: {flag}");
        Ok(Response::new(proto::BooleanFlag { flag }))
    }

    async fn dataset_exists(
        &self,
        request: Request<proto::Path>,
    ) -> Result<Response<proto::BooleanFlag>, Status> {
        let path = request.into_inner().path_name;
        let flag = self.reader.dataset_exists(&path).await?;
        log::debug!("dataset_exists {path:?}: {flag}");
        Ok(Response::new(proto::BooleanFlag { flag }))
    }

    async fn list(&self, request: Request<proto::Path>) -> Result<Response<proto::Paths>, Status> {
        let path = request.into_inner().path_name;
        log::debug!("list {path:?}");
        let paths = self
            .reader
            .list(&path)
            .await?
            .into_iter()
            .map(|path_name| proto::Path { path_name })
            .collect();
        Ok(Response::new(proto::Paths { paths }))
    }

    async fn health_check(
        &self,
        _request: Request<proto::HealthRequest>,
    ) -> Result<Response<proto::HealthStatus>, Status> {
        Ok(Response::new(proto::HealthStatus {
            status: proto::ServingStatus::Serving.into(),
        }))
    }
}

/// A running server, see [serve].
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), tonic::transport::Error>>,
    shutdown_timeout: Duration,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URI clients can connect to.
    pub fn uri(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting calls and wait for the server to wind down,
    /// up to the configured shutdown timeout.
    pub async fn stop(self) -> crate::Result<()> {
        log::info!("shutting down server on {}", self.local_addr);
        // the server may already have exited on its own
        let _ = self.shutdown.send(());
        let mut task = self.task;
        match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
            Ok(joined) => {
                joined.map_err(crate::Error::wrap)??;
                log::info!("server on {} shut down", self.local_addr);
                Ok(())
            }
            Err(_) => {
                log::warn!(
                    "server on {} did not shut down within {:?}; aborting",
                    self.local_addr,
                    self.shutdown_timeout
                );
                task.abort();
                Ok(())
            }
        }
    }
}

/// Serve `reader` on the address given in `config`.
pub async fn serve<R: N5Reader + 'static>(
    reader: R,
    config: &ServerConfig,
) -> crate::Result<ServerHandle> {
    let listener = TcpListener::bind((config.address.as_str(), config.port))
        .await
        .map_err(crate::Error::wrap)?;
    let local_addr = listener.local_addr().map_err(crate::Error::wrap)?;
    let (shutdown, signal) = oneshot::channel::<()>();
    let server = N5GrpcService::new(reader).into_server();

    let task = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(server)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                signal.await.ok();
            })
            .await
    });
    log::info!("Server started, listening on {local_addr}");

    Ok(ServerHandle {
        local_addr,
        shutdown,
        task,
        shutdown_timeout: config.shutdown_timeout,
    })
}
