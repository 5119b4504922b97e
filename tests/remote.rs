use std::sync::Arc;
use std::time::{Duration, Instant};

use n5_grpc::config::{ClientConfig, ServerConfig};
use n5_grpc::pool::WorkerPool;
use n5_grpc::proto::ServingStatus;
use n5_grpc::source::FunctionSource;
use n5_grpc::tree::Dataset;
use n5_grpc::{
    ClosableGrpcReader, Compression, DataType, DatasetAttributes, Error, GrpcReader, N5Reader,
    N5ReaderExt, ServerHandle, TreeReader, serve,
};

fn server_config() -> ServerConfig {
    env_logger::try_init().ok();
    ServerConfig {
        port: 0,
        num_threads: 2,
        shutdown_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn dataset(dimensions: Vec<u64>, compression: Compression) -> Dataset {
    let attributes = DatasetAttributes::new(
        dimensions,
        vec![32, 32],
        DataType::Uint64,
        compression,
    )
    .unwrap();
    let mut meta = serde_json::Map::new();
    meta.insert("unit".into(), serde_json::json!("nm"));
    let source =
        FunctionSource::new(|p: &[u64]| p.iter().sum::<u64>()).with_attributes(meta);
    Dataset::new(attributes, Arc::new(source)).unwrap()
}

/// Server holding a one-element dataset "slow" whose block takes `delay` to compute.
async fn start_slow(delay: Duration) -> ServerHandle {
    let config = server_config();
    let attributes =
        DatasetAttributes::new(vec![1], vec![1], DataType::Uint8, Compression::Raw).unwrap();
    let source = FunctionSource::new(move |_: &[u64]| {
        std::thread::sleep(delay);
        7u8
    });
    let slow = Dataset::new(attributes, Arc::new(source)).unwrap();
    let reader =
        TreeReader::from_datasets([("slow", Some(slow))], WorkerPool::new(config.num_threads))
            .unwrap();
    serve(reader, &config).await.unwrap()
}

async fn start() -> ServerHandle {
    let config = server_config();
    let reader = TreeReader::from_datasets(
        [
            ("x", Some(dataset(vec![64, 64], Compression::Raw))),
            ("my/gz", Some(dataset(vec![100, 100], Compression::gzip()))),
            ("my/group", None),
        ],
        WorkerPool::new(config.num_threads),
    )
    .unwrap();
    serve(reader, &config).await.unwrap()
}

#[tokio::test]
async fn remote_reads_match_the_tree() {
    let server = start().await;
    let reader = GrpcReader::connect(server.uri()).await.unwrap();

    assert!(reader.exists("x").await.unwrap());
    assert!(reader.dataset_exists("x").await.unwrap());
    assert!(!reader.exists("y").await.unwrap());
    assert!(reader.exists("").await.unwrap());
    assert!(reader.exists("my/group").await.unwrap());
    assert!(!reader.dataset_exists("my/group").await.unwrap());

    let attrs = reader.get_dataset_attributes("x").await.unwrap().unwrap();
    assert_eq!(attrs.dimensions(), &[64, 64]);
    assert_eq!(attrs.compression(), &Compression::Raw);
    assert!(reader.get_dataset_attributes("y").await.unwrap().is_none());

    let block = reader.read_block("x", &attrs, &[0, 0]).await.unwrap().unwrap();
    assert_eq!(block.num_elements(), 1024);
    assert_eq!(block.grid_position(), &[0, 0]);
    let values = block.to_elements::<u64>().unwrap();
    assert_eq!(values[33], 1 + 1);

    assert!(reader.read_block("x", &attrs, &[5, 5]).await.unwrap().is_none());
    assert!(reader.read_block("y", &attrs, &[0, 0]).await.unwrap().is_none());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn compressed_edge_block() {
    let server = start().await;
    let reader = GrpcReader::connect(server.uri()).await.unwrap();

    let attrs = reader.get_dataset_attributes("my/gz").await.unwrap().unwrap();
    assert_eq!(attrs.compression(), &Compression::gzip());
    let block = reader.read_block("my/gz", &attrs, &[3, 3]).await.unwrap().unwrap();
    assert_eq!(block.size(), &[4, 4]);
    let values = block.to_elements::<u64>().unwrap();
    assert_eq!(values.len(), 16);
    assert_eq!(values[0], 96 + 96);
    assert_eq!(values[15], 99 + 99);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn listing_and_attributes() {
    let server = start().await;
    let reader = GrpcReader::connect(server.uri()).await.unwrap();

    assert_eq!(reader.list("").await.unwrap(), vec!["my", "x"]);
    assert_eq!(reader.list("my").await.unwrap(), vec!["group", "gz"]);
    assert!(reader.list("x").await.unwrap().is_empty());

    let unit: Option<String> = reader.get_attribute("x", "unit").await.unwrap();
    assert_eq!(unit.as_deref(), Some("nm"));
    let missing: Option<String> = reader.get_attribute("x", "offset").await.unwrap();
    assert!(missing.is_none());
    assert!(reader.get_attributes("my/group").await.unwrap().is_empty());

    assert_eq!(reader.health_check().await.unwrap(), ServingStatus::Serving);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn unknown_compression_fails_the_call() {
    let server = start().await;
    let reader = GrpcReader::connect(server.uri()).await.unwrap();

    let mut parameters = serde_json::Map::new();
    parameters.insert("clevel".into(), serde_json::json!(5));
    let attrs = DatasetAttributes::new(
        vec![64, 64],
        vec![32, 32],
        DataType::Uint64,
        Compression::Custom {
            type_name: "blosc".into(),
            parameters,
        },
    )
    .unwrap();
    let err = reader.read_block("x", &attrs, &[0, 0]).await.unwrap_err();
    let Error::Rpc(status) = err else {
        panic!("expected a failed call, got {err:?}");
    };
    assert_eq!(status.code(), tonic::Code::Unimplemented);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn transport_failure_is_not_absence() {
    let server = start().await;
    let uri = server.uri();
    let reader = GrpcReader::connect(uri).await.unwrap();
    server.stop().await.unwrap();

    let err = reader.exists("x").await.unwrap_err();
    assert!(matches!(err, Error::Rpc(_) | Error::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn closable_reader_rejects_calls_after_close() {
    let server = start().await;
    let reader = ClosableGrpcReader::connect(&ClientConfig {
        target: server.uri(),
        shutdown_timeout: Duration::from_secs(1),
    })
    .await
    .unwrap();

    assert!(reader.exists("x").await.unwrap());
    assert_eq!(reader.health_check().await.unwrap(), ServingStatus::Serving);
    assert!(!reader.is_closed());

    reader.close().await.unwrap();
    assert!(reader.is_closed());
    assert!(matches!(reader.exists("x").await, Err(Error::Closed)));
    assert!(matches!(reader.list("").await, Err(Error::Closed)));
    reader.close().await.unwrap();

    server.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_block_reads() {
    let server = start().await;
    let reader = Arc::new(GrpcReader::connect(server.uri()).await.unwrap());
    let attrs = reader.get_dataset_attributes("my/gz").await.unwrap().unwrap();

    let mut tasks = Vec::new();
    for i in 0..4u64 {
        for j in 0..4u64 {
            let reader = reader.clone();
            let attrs = attrs.clone();
            tasks.push(tokio::spawn(async move {
                let block = reader
                    .read_block("my/gz", &attrs, &[i, j])
                    .await
                    .unwrap()
                    .unwrap();
                let values = block.to_elements::<u64>().unwrap();
                assert_eq!(values[0], 32 * i + 32 * j);
            }));
        }
    }
    for task in tasks {
        task.await.unwrap();
    }
    server.stop().await.unwrap();
}

#[tokio::test]
async fn unknown_short_name_is_invalid_argument() {
    use n5_grpc::proto::dataset_attributes::Compression as WireCompression;
    use n5_grpc::proto::n5_service_client::N5ServiceClient;

    let server = start().await;
    let mut client = N5ServiceClient::connect(server.uri()).await.unwrap();
    let meta = n5_grpc::proto::BlockMeta {
        path: Some(n5_grpc::wire::path_message("x")),
        grid_position: vec![0, 0],
        dataset_attributes: Some(n5_grpc::proto::DatasetAttributes {
            dimensions: vec![64, 64],
            block_size: vec![32, 32],
            data_type: "uint64".into(),
            compression: Some(WireCompression::CompressionType("snappy".into())),
        }),
    };
    let status = client.read_block(meta.clone()).await.unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);

    let mut gzip = meta;
    if let Some(attrs) = gzip.dataset_attributes.as_mut() {
        attrs.compression = Some(WireCompression::CompressionType("gzip".into()));
    }
    let block = client.read_block(gzip).await.unwrap().into_inner();
    assert!(matches!(
        block.value,
        Some(n5_grpc::proto::nullable_block::Value::Block(_))
    ));

    server.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_waits_for_calls_in_flight() {
    let server = start_slow(Duration::from_millis(300)).await;
    let reader = Arc::new(
        ClosableGrpcReader::connect(&ClientConfig {
            target: server.uri(),
            shutdown_timeout: Duration::from_secs(5),
        })
        .await
        .unwrap(),
    );
    let attrs = reader.get_dataset_attributes("slow").await.unwrap().unwrap();

    let call = tokio::spawn({
        let reader = reader.clone();
        async move { reader.read_block("slow", &attrs, &[0]).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let closing = tokio::spawn({
        let reader = reader.clone();
        async move { reader.close().await }
    });
    while !reader.is_closed() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(!call.is_finished());
    assert!(matches!(reader.exists("slow").await, Err(Error::Closed)));

    closing.await.unwrap().unwrap();
    assert!(started.elapsed() >= Duration::from_millis(150));
    let block = call.await.unwrap().unwrap().unwrap();
    assert_eq!(block.to_elements::<u8>().unwrap(), vec![7]);
    assert!(matches!(reader.exists("slow").await, Err(Error::Closed)));

    server.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_gives_up_after_timeout() {
    let server = start_slow(Duration::from_secs(2)).await;
    let reader = Arc::new(
        ClosableGrpcReader::connect(&ClientConfig {
            target: server.uri(),
            shutdown_timeout: Duration::from_millis(200),
        })
        .await
        .unwrap(),
    );
    let attrs = reader.get_dataset_attributes("slow").await.unwrap().unwrap();

    let call = tokio::spawn({
        let reader = reader.clone();
        async move { reader.read_block("slow", &attrs, &[0]).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    reader.close().await.unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1500), "{elapsed:?}");
    assert!(!call.is_finished());
    assert!(reader.is_closed());
    assert!(matches!(reader.list("").await, Err(Error::Closed)));

    call.await.unwrap().ok();
    server.stop().await.unwrap();
}

#[tokio::test]
async fn mismatched_data_type_fails_the_call() {
    let server = start().await;
    let reader = GrpcReader::connect(server.uri()).await.unwrap();

    let attrs =
        DatasetAttributes::new(vec![64, 64], vec![32, 32], DataType::Int16, Compression::Raw)
            .unwrap();
    let err = reader.read_block("x", &attrs, &[0, 0]).await.unwrap_err();
    let Error::Rpc(status) = err else {
        panic!("expected a failed call, got {err:?}");
    };
    assert_eq!(status.code(), tonic::Code::InvalidArgument);

    server.stop().await.unwrap();
}
