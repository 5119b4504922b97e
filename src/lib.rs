pub mod block;
pub mod client;
pub mod codec;
pub mod config;
mod error;
pub mod metadata;
pub mod pool;
pub mod proto;
pub mod reader;
pub mod router;
pub mod service;
pub mod source;
pub mod tree;
pub mod wire;

pub use block::{DataBlock, Element};
pub use client::{ClosableGrpcReader, GrpcReader};
pub use error::{Error, Result};
pub use metadata::{Compression, DataType, DatasetAttributes};
pub use reader::{N5Reader, N5ReaderExt};
pub use router::TreeReader;
pub use service::{N5GrpcService, ServerHandle, serve};
