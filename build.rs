use tonic_build::manual::{Builder, Method, Service};

fn method(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::proto::{input}"))
        .output_type(format!("crate::proto::{output}"))
        .codec_path("tonic::codec::ProstCodec")
        .build()
}

fn main() {
    let service = Service::builder()
        .name("N5Service")
        .package("n5.grpc")
        .method(method("get_attributes", "GetAttributes", "Path", "JsonString"))
        .method(method(
            "get_dataset_attributes",
            "GetDatasetAttributes",
            "Path",
            "NullableDatasetAttributes",
        ))
        .method(method("read_block", "ReadBlock", "BlockMeta", "NullableBlock"))
        .method(method("exists", "Exists", "Path", "BooleanFlag"))
        .method(method("dataset_exists", "DatasetExists", "Path", "BooleanFlag"))
        .method(method("list", "List", "Path", "Paths"))
        .method(method("health_check", "HealthCheck", "HealthRequest", "HealthStatus"))
        .build();

    Builder::new().compile(&[service]);
    println!("cargo:rerun-if-changed=build.rs");
}
