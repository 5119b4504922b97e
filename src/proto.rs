//! Wire messages of the `n5.grpc.N5Service` service.
//!
//! Client and server stubs are generated by the build script.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum NullValue {
    NullValue = 0,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Path {
    #[prost(string, tag = "1")]
    pub path_name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DatasetAttributes {
    #[prost(int64, repeated, tag = "1")]
    pub dimensions: Vec<i64>,
    #[prost(int32, repeated, tag = "2")]
    pub block_size: Vec<i32>,
    #[prost(string, tag = "3")]
    pub data_type: String,
    #[prost(oneof = "dataset_attributes::Compression", tags = "4, 5")]
    pub compression: Option<dataset_attributes::Compression>,
}

pub mod dataset_attributes {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Compression {
        /// Short name, e.g. `gzip`.
        #[prost(string, tag = "4")]
        CompressionType(String),
        /// Structured N5 compression JSON.
        #[prost(string, tag = "5")]
        CompressionJsonString(String),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NullableDatasetAttributes {
    #[prost(oneof = "nullable_dataset_attributes::Value", tags = "1, 2")]
    pub value: Option<nullable_dataset_attributes::Value>,
}

pub mod nullable_dataset_attributes {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(enumeration = "super::NullValue", tag = "1")]
        Empty(i32),
        #[prost(message, tag = "2")]
        DatasetAttributes(super::DatasetAttributes),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Block {
    #[prost(bytes = "bytes", tag = "1")]
    pub data: bytes::Bytes,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NullableBlock {
    #[prost(oneof = "nullable_block::Value", tags = "1, 2")]
    pub value: Option<nullable_block::Value>,
}

pub mod nullable_block {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(enumeration = "super::NullValue", tag = "1")]
        Empty(i32),
        #[prost(message, tag = "2")]
        Block(super::Block),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BlockMeta {
    #[prost(message, optional, tag = "1")]
    pub path: Option<Path>,
    #[prost(int64, repeated, tag = "2")]
    pub grid_position: Vec<i64>,
    #[prost(message, optional, tag = "3")]
    pub dataset_attributes: Option<DatasetAttributes>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BooleanFlag {
    #[prost(bool, tag = "1")]
    pub flag: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Paths {
    #[prost(message, repeated, tag = "1")]
    pub paths: Vec<Path>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct JsonString {
    #[prost(string, tag = "1")]
    pub json_string: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthRequest {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ServingStatus {
    Unknown = 0,
    Serving = 1,
    NotServing = 2,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthStatus {
    #[prost(enumeration = "ServingStatus", tag = "1")]
    pub status: i32,
}

include!(concat!(env!("OUT_DIR"), "/n5.grpc.N5Service.rs"));
