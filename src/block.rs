use crate::codec;
use crate::metadata::{DataType, DatasetAttributes};

/// A single block of a dataset.
///
/// Element bytes are kept big-endian, in F order (axis 0 fastest),
/// as they appear in N5 block files.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    size: Vec<u32>,
    grid_position: Vec<u64>,
    data_type: DataType,
    num_elements: usize,
    data: Vec<u8>,
}

/// Primitive element of a [DataBlock].
pub trait Element: Copy + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn write_be(self, out: &mut Vec<u8>);

    /// `bytes` has exactly the element size.
    fn read_be(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($t:ty, $dt:expr) => {
        impl Element for $t {
            const DATA_TYPE: DataType = $dt;

            fn write_be(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_be_bytes());
            }

            fn read_be(bytes: &[u8]) -> Self {
                let mut buf = [0u8; size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_be_bytes(buf)
            }
        }
    };
}

impl_element!(u8, DataType::Uint8);
impl_element!(u16, DataType::Uint16);
impl_element!(u32, DataType::Uint32);
impl_element!(u64, DataType::Uint64);
impl_element!(i8, DataType::Int8);
impl_element!(i16, DataType::Int16);
impl_element!(i32, DataType::Int32);
impl_element!(i64, DataType::Int64);
impl_element!(f32, DataType::Float32);
impl_element!(f64, DataType::Float64);

impl DataBlock {
    /// Wrap big-endian element bytes.
    pub fn new(
        size: Vec<u32>,
        grid_position: Vec<u64>,
        data_type: DataType,
        data: Vec<u8>,
    ) -> crate::Result<Self> {
        let element_size = data_type.element_size().ok_or_else(|| {
            crate::Error::unsupported(format!("blocks of data type {data_type}"))
        })?;
        if data.len() % element_size != 0 {
            return Err(crate::Error::format(format!(
                "{} bytes is not a whole number of {data_type} elements",
                data.len()
            )));
        }
        Ok(Self {
            num_elements: data.len() / element_size,
            size,
            grid_position,
            data_type,
            data,
        })
    }

    pub fn from_elements<T: Element>(
        size: Vec<u32>,
        grid_position: Vec<u64>,
        elements: &[T],
    ) -> Self {
        let mut data = Vec::with_capacity(elements.len() * size_of::<T>());
        for &el in elements {
            el.write_be(&mut data);
        }
        Self {
            size,
            grid_position,
            data_type: T::DATA_TYPE,
            num_elements: elements.len(),
            data,
        }
    }

    pub fn to_elements<T: Element>(&self) -> crate::Result<Vec<T>> {
        if T::DATA_TYPE != self.data_type {
            return Err(crate::Error::general(format!(
                "block holds {} elements, not {}",
                self.data_type,
                T::DATA_TYPE
            )));
        }
        Ok(self
            .data
            .chunks_exact(size_of::<T>())
            .map(T::read_be)
            .collect())
    }

    pub fn size(&self) -> &[u32] {
        &self.size
    }

    pub fn grid_position(&self) -> &[u64] {
        &self.grid_position
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Big-endian element bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serialize in the N5 block layout, compressed as described by `attributes`.
    pub fn to_bytes(&self, attributes: &DatasetAttributes) -> crate::Result<Vec<u8>> {
        let nominal: u64 = self.size.iter().map(|&s| s as u64).product();
        let header = BlockHeader {
            mode: if nominal == self.num_elements as u64 {
                BlockMode::Default
            } else {
                BlockMode::VarLen {
                    num_el: u32::try_from(self.num_elements).map_err(|_| {
                        crate::Error::format(format!("too many elements: {}", self.num_elements))
                    })?,
                }
            },
            shape: self.size.clone(),
        };
        let payload = codec::compress(attributes.compression(), &self.data)?;
        let mut out = Vec::with_capacity(header.data_offset() + payload.len());
        header.write(&mut out)?;
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Parse the N5 block layout.
    ///
    /// The grid position is not part of the serialized block.
    pub fn from_bytes(
        bytes: &[u8],
        attributes: &DatasetAttributes,
        grid_position: Vec<u64>,
    ) -> crate::Result<Self> {
        let header = BlockHeader::from_bytes(bytes)?;
        let num_elements = match header.mode {
            BlockMode::Default => header
                .shape
                .iter()
                .try_fold(1u64, |acc, &s| acc.checked_mul(u64::from(s)))
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    crate::Error::format(format!("N5 block shape {:?} is too large", header.shape))
                })?,
            BlockMode::VarLen { num_el } => usize::try_from(num_el)
                .map_err(|_| crate::Error::format(format!("{num_el} elements is too many")))?,
            BlockMode::Object => {
                return Err(crate::Error::unsupported("N5 object blocks"));
            }
        };
        let data_type = attributes.data_type();
        let element_size = data_type.element_size().ok_or_else(|| {
            crate::Error::unsupported(format!("blocks of data type {data_type}"))
        })?;
        let decoded_len = num_elements.checked_mul(element_size).ok_or_else(|| {
            crate::Error::format(format!("{num_elements} elements of {data_type} is too large"))
        })?;
        let data = codec::decompress(
            attributes.compression(),
            &bytes[header.data_offset()..],
            decoded_len,
        )?;
        Ok(Self {
            size: header.shape,
            grid_position,
            data_type,
            num_elements,
            data,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct BlockHeader {
    pub(crate) mode: BlockMode,
    /// Column-major.
    pub(crate) shape: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BlockMode {
    Default,
    VarLen { num_el: u32 },
    Object,
}

impl BlockMode {
    fn discriminant(&self) -> u16 {
        match self {
            BlockMode::Default => 0,
            BlockMode::VarLen { .. } => 1,
            BlockMode::Object => 2,
        }
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> crate::Result<u16> {
    bytes
        .get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_be_bytes)
        .ok_or_else(|| crate::Error::format("N5 block header is truncated"))
}

fn read_u32(bytes: &[u8], offset: usize) -> crate::Result<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_be_bytes)
        .ok_or_else(|| crate::Error::format("N5 block header is truncated"))
}

impl BlockHeader {
    pub(crate) fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        let mut offset: usize = 0;

        let mode_num = read_u16(bytes, offset)?;
        offset += 2;
        if mode_num == 2 {
            return Ok(BlockHeader {
                mode: BlockMode::Object,
                shape: Vec::new(),
            });
        }
        let ndim = read_u16(bytes, offset)?;
        offset += 2;
        let mut shape = Vec::with_capacity(ndim as usize);
        for _ in 0..ndim {
            shape.push(read_u32(bytes, offset)?);
            offset += 4;
        }

        let mode = match mode_num {
            0 => BlockMode::Default,
            1 => BlockMode::VarLen {
                num_el: read_u32(bytes, offset)?,
            },
            n => return Err(crate::Error::format(format!("invalid N5 block mode {n}"))),
        };
        Ok(BlockHeader { mode, shape })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) -> crate::Result<()> {
        out.extend_from_slice(&self.mode.discriminant().to_be_bytes());
        let ndim = u16::try_from(self.shape.len())
            .map_err(|_| crate::Error::format(format!("too many dimensions: {}", self.shape.len())))?;
        out.extend_from_slice(&ndim.to_be_bytes());
        for s in &self.shape {
            out.extend_from_slice(&s.to_be_bytes());
        }
        if let BlockMode::VarLen { num_el } = self.mode {
            out.extend_from_slice(&num_el.to_be_bytes());
        }
        Ok(())
    }

    pub(crate) fn data_offset(&self) -> usize {
        size_of::<u16>()  // mode discriminator
            + match self.mode {
                BlockMode::Object => 0,
                _ => size_of::<u16>() + self.shape.len() * size_of::<u32>(), // ndim, shape
            }
            + match self.mode {
                BlockMode::VarLen { .. } => size_of::<u32>(),
                _ => 0,
            }
    }
}
