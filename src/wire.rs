//! Conversion between the domain types and the wire messages.
//!
//! Dataset attributes are always sent with structured compression JSON,
//! but either the structured or the short-name form is accepted on decode.

use crate::block::DataBlock;
use crate::metadata::{Compression, DataType, DatasetAttributes};
use crate::proto;
use crate::proto::dataset_attributes::Compression as WireCompression;
use crate::proto::{nullable_block, nullable_dataset_attributes};

/// Wire path for `path`; an empty path addresses the root.
pub fn path_message(path: &str) -> proto::Path {
    proto::Path {
        path_name: path.to_string(),
    }
}

pub fn encode_attributes(attributes: &DatasetAttributes) -> crate::Result<proto::DatasetAttributes> {
    let block_size = attributes
        .block_size()
        .iter()
        .map(|&b| {
            i32::try_from(b)
                .map_err(|_| crate::Error::format(format!("block size {b} exceeds int32")))
        })
        .collect::<crate::Result<Vec<_>>>()?;
    let dimensions = attributes
        .dimensions()
        .iter()
        .map(|&d| {
            i64::try_from(d).map_err(|_| crate::Error::format(format!("dimension {d} exceeds int64")))
        })
        .collect::<crate::Result<Vec<_>>>()?;
    Ok(proto::DatasetAttributes {
        dimensions,
        block_size,
        data_type: attributes.data_type().to_string(),
        compression: Some(WireCompression::CompressionJsonString(
            serde_json::to_string(attributes.compression())?,
        )),
    })
}

pub fn decode_attributes(message: proto::DatasetAttributes) -> crate::Result<DatasetAttributes> {
    let compression = match message.compression {
        Some(WireCompression::CompressionJsonString(json)) => {
            serde_json::from_str::<Compression>(&json)?
        }
        Some(WireCompression::CompressionType(name)) => Compression::from_name(&name)?,
        None => return Err(crate::Error::configuration("no compression type provided")),
    };
    let dimensions = message
        .dimensions
        .into_iter()
        .map(|d| {
            u64::try_from(d).map_err(|_| crate::Error::format(format!("negative dimension {d}")))
        })
        .collect::<crate::Result<Vec<_>>>()?;
    let block_size = message
        .block_size
        .into_iter()
        .map(|b| {
            u32::try_from(b).map_err(|_| crate::Error::format(format!("negative block size {b}")))
        })
        .collect::<crate::Result<Vec<_>>>()?;
    let data_type: DataType = message.data_type.parse()?;
    DatasetAttributes::new(dimensions, block_size, data_type, compression)
}

pub fn encode_nullable_attributes(
    attributes: Option<&DatasetAttributes>,
) -> crate::Result<proto::NullableDatasetAttributes> {
    let value = match attributes {
        None => nullable_dataset_attributes::Value::Empty(proto::NullValue::NullValue.into()),
        Some(a) => nullable_dataset_attributes::Value::DatasetAttributes(encode_attributes(a)?),
    };
    Ok(proto::NullableDatasetAttributes { value: Some(value) })
}

pub fn decode_nullable_attributes(
    message: proto::NullableDatasetAttributes,
) -> crate::Result<Option<DatasetAttributes>> {
    match message.value {
        Some(nullable_dataset_attributes::Value::Empty(_)) => Ok(None),
        Some(nullable_dataset_attributes::Value::DatasetAttributes(a)) => {
            decode_attributes(a).map(Some)
        }
        None => Err(crate::Error::format(
            "nullable dataset attributes carry neither a value nor an empty marker",
        )),
    }
}

pub fn encode_block(
    block: &DataBlock,
    attributes: &DatasetAttributes,
) -> crate::Result<proto::Block> {
    Ok(proto::Block {
        data: block.to_bytes(attributes)?.into(),
    })
}

pub fn decode_block(
    message: &proto::Block,
    attributes: &DatasetAttributes,
    grid_position: &[u64],
) -> crate::Result<DataBlock> {
    DataBlock::from_bytes(&message.data, attributes, grid_position.to_vec())
}

/// Encode an optional block.
///
/// Attributes are only consulted for a present block.
pub fn encode_nullable_block(
    block: Option<&DataBlock>,
    attributes: Option<&DatasetAttributes>,
) -> crate::Result<proto::NullableBlock> {
    let value = match block {
        None => nullable_block::Value::Empty(proto::NullValue::NullValue.into()),
        Some(b) => {
            let attributes = attributes.ok_or_else(|| {
                crate::Error::general("dataset attributes are required to encode a block")
            })?;
            nullable_block::Value::Block(encode_block(b, attributes)?)
        }
    };
    Ok(proto::NullableBlock { value: Some(value) })
}

/// Decode an optional block.
///
/// Attributes are only required if the block is present.
pub fn decode_nullable_block(
    message: proto::NullableBlock,
    attributes: Option<&DatasetAttributes>,
    grid_position: &[u64],
) -> crate::Result<Option<DataBlock>> {
    match message.value {
        Some(nullable_block::Value::Empty(_)) => Ok(None),
        Some(nullable_block::Value::Block(b)) => {
            let attributes = attributes.ok_or_else(|| {
                crate::Error::general("dataset attributes are required to decode a block")
            })?;
            decode_block(&b, attributes, grid_position).map(Some)
        }
        None => Err(crate::Error::format(
            "nullable block carries neither a value nor an empty marker",
        )),
    }
}

pub fn encode_grid_position(grid_position: &[u64]) -> crate::Result<Vec<i64>> {
    grid_position
        .iter()
        .map(|&g| {
            i64::try_from(g)
                .map_err(|_| crate::Error::format(format!("grid position {g} exceeds int64")))
        })
        .collect()
}

pub fn decode_grid_position(grid_position: &[i64]) -> crate::Result<Vec<u64>> {
    grid_position
        .iter()
        .map(|&g| {
            u64::try_from(g)
                .map_err(|_| crate::Error::format(format!("negative grid position {g}")))
        })
        .collect()
}
