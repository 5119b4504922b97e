use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// N5 data type of a dataset's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Object,
}

impl DataType {
    pub const ALL: [DataType; 11] = [
        DataType::Uint8,
        DataType::Uint16,
        DataType::Uint32,
        DataType::Uint64,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Float32,
        DataType::Float64,
        DataType::Object,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Object => "object",
        }
    }

    /// Size of one element in bytes; `None` for variable-size objects.
    pub fn element_size(&self) -> Option<usize> {
        match self {
            DataType::Uint8 | DataType::Int8 => Some(1),
            DataType::Uint16 | DataType::Int16 => Some(2),
            DataType::Uint32 | DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Uint64 | DataType::Int64 | DataType::Float64 => Some(8),
            DataType::Object => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|dt| dt.as_str() == s)
            .ok_or_else(|| Error::configuration(format!("unknown data type: {s}")))
    }
}

/// N5 block compression configuration.
///
/// Serialized as the structured N5 form, e.g. `{"type": "gzip", "level": -1}`.
/// Types this crate does not know are kept as [Compression::Custom]
/// so that their parameters survive a round trip.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Compression {
    /// Uncompressed.
    #[default]
    Raw,
    Bzip2 {
        /// Default 9. Must be in the range 1..=9.
        block_size: u8,
    },
    Gzip {
        /// Default -1, meaning "implementation default" (usually 6).
        level: i8,
        /// Zlib rather than gzip framing. Default false.
        use_zlib: bool,
    },
    Lz4 {
        /// Default 65536. Must be a positive integer.
        block_size: u32,
    },
    Xz {
        /// Default 6.
        preset: u32,
    },
    Custom {
        type_name: String,
        parameters: serde_json::Map<String, serde_json::Value>,
    },
}

fn default_bzip2_block_size() -> u8 {
    9
}

fn default_gzip_level() -> i8 {
    -1
}

fn default_lz4_block_size() -> u32 {
    65536
}

fn default_xz_preset() -> u32 {
    6
}

/// Structured form of the built-in compressions.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
enum BuiltinCompression {
    Raw,
    Bzip2 {
        #[serde(rename = "blockSize", default = "default_bzip2_block_size")]
        block_size: u8,
    },
    Gzip {
        #[serde(default = "default_gzip_level")]
        level: i8,
        #[serde(rename = "useZlib", default)]
        use_zlib: bool,
    },
    Lz4 {
        #[serde(rename = "blockSize", default = "default_lz4_block_size")]
        block_size: u32,
    },
    Xz {
        #[serde(default = "default_xz_preset")]
        preset: u32,
    },
}

const BUILTIN_TYPES: [&str; 5] = ["raw", "bzip2", "gzip", "lz4", "xz"];

impl Compression {
    pub const fn raw() -> Self {
        Compression::Raw
    }

    pub const fn bzip2() -> Self {
        Compression::Bzip2 { block_size: 9 }
    }

    pub const fn gzip() -> Self {
        Compression::Gzip {
            level: -1,
            use_zlib: false,
        }
    }

    pub const fn lz4() -> Self {
        Compression::Lz4 { block_size: 65536 }
    }

    pub const fn xz() -> Self {
        Compression::Xz { preset: 6 }
    }

    /// The N5 `type` name.
    pub fn type_name(&self) -> &str {
        match self {
            Compression::Raw => "raw",
            Compression::Bzip2 { .. } => "bzip2",
            Compression::Gzip { .. } => "gzip",
            Compression::Lz4 { .. } => "lz4",
            Compression::Xz { .. } => "xz",
            Compression::Custom { type_name, .. } => type_name,
        }
    }

    /// Resolve a compression from its short name, with default parameters.
    ///
    /// Only names registered as [CompressionName] are accepted.
    pub fn from_name(name: &str) -> crate::Result<Self> {
        inventory::iter::<CompressionName>
            .into_iter()
            .find(|entry| entry.name == name)
            .map(|entry| (entry.create)())
            .ok_or_else(|| Error::configuration(format!("unknown compression type: {name}")))
    }
}

impl From<BuiltinCompression> for Compression {
    fn from(value: BuiltinCompression) -> Self {
        match value {
            BuiltinCompression::Raw => Compression::Raw,
            BuiltinCompression::Bzip2 { block_size } => Compression::Bzip2 { block_size },
            BuiltinCompression::Gzip { level, use_zlib } => Compression::Gzip { level, use_zlib },
            BuiltinCompression::Lz4 { block_size } => Compression::Lz4 { block_size },
            BuiltinCompression::Xz { preset } => Compression::Xz { preset },
        }
    }
}

impl Serialize for Compression {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let builtin = match self {
            Compression::Raw => BuiltinCompression::Raw,
            Compression::Bzip2 { block_size } => BuiltinCompression::Bzip2 {
                block_size: *block_size,
            },
            Compression::Gzip { level, use_zlib } => BuiltinCompression::Gzip {
                level: *level,
                use_zlib: *use_zlib,
            },
            Compression::Lz4 { block_size } => BuiltinCompression::Lz4 {
                block_size: *block_size,
            },
            Compression::Xz { preset } => BuiltinCompression::Xz { preset: *preset },
            Compression::Custom {
                type_name,
                parameters,
            } => {
                let mut map = parameters.clone();
                map.insert(
                    "type".to_string(),
                    serde_json::Value::String(type_name.clone()),
                );
                return map.serialize(serializer);
            }
        };
        builtin.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Compression {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let mut map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let type_name = match map.get("type") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "compression type must be a string, got {other}"
                )));
            }
            None => return Err(D::Error::missing_field("type")),
        };
        if BUILTIN_TYPES.contains(&type_name.as_str()) {
            let builtin: BuiltinCompression =
                serde_json::from_value(serde_json::Value::Object(map)).map_err(D::Error::custom)?;
            Ok(builtin.into())
        } else {
            map.remove("type");
            Ok(Compression::Custom {
                type_name,
                parameters: map,
            })
        }
    }
}

/// Short-name entry for compression lookup, see [Compression::from_name].
///
/// Further names can be registered with `inventory::submit!`.
pub struct CompressionName {
    pub name: &'static str,
    pub create: fn() -> Compression,
}

impl CompressionName {
    pub const fn new(name: &'static str, create: fn() -> Compression) -> Self {
        Self { name, create }
    }
}

inventory::collect!(CompressionName);

inventory::submit! { CompressionName::new("raw", Compression::raw) }
inventory::submit! { CompressionName::new("gzip", Compression::gzip) }
inventory::submit! { CompressionName::new("bzip2", Compression::bzip2) }
inventory::submit! { CompressionName::new("lz4", Compression::lz4) }
inventory::submit! { CompressionName::new("xz", Compression::xz) }

/// Shape, block size, data type and compression of a dataset.
///
/// Note that N5 uses F order: axis 0 varies fastest within a block.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetAttributes {
    dimensions: Vec<u64>,
    block_size: Vec<u32>,
    data_type: DataType,
    compression: Compression,
}

impl DatasetAttributes {
    pub fn new(
        dimensions: Vec<u64>,
        block_size: Vec<u32>,
        data_type: DataType,
        compression: Compression,
    ) -> crate::Result<Self> {
        if dimensions.is_empty() {
            return Err(Error::configuration("dataset must have at least one dimension"));
        }
        if dimensions.len() != block_size.len() {
            return Err(Error::configuration(format!(
                "dimensions {dimensions:?} and block size {block_size:?} differ in length"
            )));
        }
        if block_size.contains(&0) {
            return Err(Error::configuration(format!(
                "block size {block_size:?} has a zero entry"
            )));
        }
        Ok(Self {
            dimensions,
            block_size,
            data_type,
            compression,
        })
    }

    pub fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    pub fn block_size(&self) -> &[u32] {
        &self.block_size
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn compression(&self) -> &Compression {
        &self.compression
    }

    pub fn num_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    /// Number of blocks along each axis, counting partial edge blocks.
    pub fn grid_size(&self) -> Vec<u64> {
        self.dimensions
            .iter()
            .zip(&self.block_size)
            .map(|(&d, &b)| d.div_ceil(b as u64))
            .collect()
    }

    /// Offset and clamped size of the block at `grid_position`.
    ///
    /// Edge blocks are cut to `[0, dimension)`.
    /// Returns `None` if the position lies outside the grid.
    pub fn block_interval(&self, grid_position: &[u64]) -> Option<(Vec<u64>, Vec<u32>)> {
        if grid_position.len() != self.num_dimensions() {
            return None;
        }
        let mut min = Vec::with_capacity(grid_position.len());
        let mut size = Vec::with_capacity(grid_position.len());
        for ((&g, &b), &d) in grid_position
            .iter()
            .zip(&self.block_size)
            .zip(&self.dimensions)
        {
            let offset = g.checked_mul(b as u64)?;
            if offset >= d {
                return None;
            }
            min.push(offset);
            size.push((d - offset).min(b as u64) as u32);
        }
        Some((min, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_resolve_to_defaults() {
        assert_eq!(Compression::from_name("raw").unwrap(), Compression::Raw);
        assert_eq!(Compression::from_name("gzip").unwrap(), Compression::gzip());
        assert_eq!(Compression::from_name("bzip2").unwrap(), Compression::bzip2());
        assert_eq!(Compression::from_name("lz4").unwrap(), Compression::lz4());
        assert_eq!(Compression::from_name("xz").unwrap(), Compression::xz());
    }

    #[test]
    fn unknown_short_name_is_configuration_error() {
        let err = Compression::from_name("zstd").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err}");
    }

    #[test]
    fn structured_defaults_match_short_names() {
        for name in BUILTIN_TYPES {
            let structured: Compression =
                serde_json::from_str(&format!(r#"{{"type": "{name}"}}"#)).unwrap();
            assert_eq!(structured, Compression::from_name(name).unwrap());
        }
    }

    #[test]
    fn structured_form_uses_n5_keys() {
        let value = serde_json::to_value(Compression::gzip()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "gzip", "level": -1, "useZlib": false})
        );
        let value = serde_json::to_value(Compression::bzip2()).unwrap();
        assert_eq!(value, serde_json::json!({"type": "bzip2", "blockSize": 9}));
    }

    #[test]
    fn unknown_type_is_kept_as_custom() {
        let json = r#"{"type": "blosc", "cname": "lz4", "clevel": 5}"#;
        let compression: Compression = serde_json::from_str(json).unwrap();
        assert_eq!(compression.type_name(), "blosc");
        let value = serde_json::to_value(&compression).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "blosc", "cname": "lz4", "clevel": 5})
        );
    }

    #[test]
    fn missing_type_is_an_error() {
        assert!(serde_json::from_str::<Compression>(r#"{"level": 3}"#).is_err());
    }

    #[test]
    fn attributes_validate_lengths() {
        assert!(
            DatasetAttributes::new(vec![10, 10], vec![5], DataType::Uint8, Compression::Raw)
                .is_err()
        );
        assert!(
            DatasetAttributes::new(vec![10], vec![0], DataType::Uint8, Compression::Raw).is_err()
        );
        assert!(DatasetAttributes::new(vec![], vec![], DataType::Uint8, Compression::Raw).is_err());
    }

    #[test]
    fn edge_block_is_clamped() {
        let attrs = DatasetAttributes::new(
            vec![100, 100],
            vec![32, 32],
            DataType::Uint8,
            Compression::Raw,
        )
        .unwrap();
        assert_eq!(attrs.grid_size(), vec![4, 4]);
        assert_eq!(
            attrs.block_interval(&[3, 3]),
            Some((vec![96, 96], vec![4, 4]))
        );
        assert_eq!(
            attrs.block_interval(&[1, 3]),
            Some((vec![32, 96], vec![32, 4]))
        );
        assert_eq!(attrs.block_interval(&[4, 0]), None);
        assert_eq!(attrs.block_interval(&[0]), None);
    }

    #[test]
    fn data_type_names() {
        for dt in DataType::ALL {
            assert_eq!(dt.as_str().parse::<DataType>().unwrap(), dt);
        }
        assert!("complex64".parse::<DataType>().is_err());
    }
}
