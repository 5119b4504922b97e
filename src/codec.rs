use std::borrow::Cow;
use std::sync::Arc;

use zarrs::array::codec::bytes_to_bytes::gzip::GzipCodec;
use zarrs::array::codec::{Bz2CompressionLevel, bytes_to_bytes::bz2::Bz2Codec};
use zarrs_codec::{BytesRepresentation, BytesToBytesCodecTraits, CodecOptions};

use crate::metadata::Compression;

/// Bytes-to-bytes codec for a compression.
///
/// `None` means the payload is stored as is.
fn compression_to_b2b(
    compression: &Compression,
) -> crate::Result<Option<Arc<dyn BytesToBytesCodecTraits>>> {
    match compression {
        Compression::Raw => Ok(None),
        Compression::Bzip2 { block_size } => Ok(Some(Arc::new(Bz2Codec::new(
            Bz2CompressionLevel::new(*block_size as u32)
                .map_err(|n| crate::Error::configuration(format!("invalid bz2 block size {n}")))?,
        )))),
        Compression::Gzip {
            level,
            use_zlib: false,
        } => {
            let lvl_int: u32 = match level {
                -1 => 6,
                n if *n >= 0 => *n as u32,
                n => {
                    return Err(crate::Error::configuration(format!(
                        "invalid gzip compression level {n}"
                    )));
                }
            };
            Ok(Some(Arc::new(
                GzipCodec::new(lvl_int).map_err(crate::Error::wrap)?,
            )))
        }
        Compression::Gzip { use_zlib: true, .. } => Err(crate::Error::unsupported(
            "gzip compression with zlib framing",
        )),
        c => Err(crate::Error::unsupported(format!(
            "block compression {:?}",
            c.type_name()
        ))),
    }
}

/// Compress a block payload.
pub fn compress(compression: &Compression, data: &[u8]) -> crate::Result<Vec<u8>> {
    let Some(codec) = compression_to_b2b(compression)? else {
        return Ok(data.to_vec());
    };
    let encoded = codec
        .encode(Cow::Borrowed(data), &CodecOptions::default())
        .map_err(|e| crate::Error::general(format!("could not compress block: {e}")))?;
    Ok(encoded.into_owned())
}

/// Decompress a block payload which should expand to `decoded_len` bytes.
pub fn decompress(
    compression: &Compression,
    data: &[u8],
    decoded_len: usize,
) -> crate::Result<Vec<u8>> {
    let decoded = match compression_to_b2b(compression)? {
        None => data.to_vec(),
        Some(codec) => codec
            .decode(
                Cow::Borrowed(data),
                &BytesRepresentation::BoundedSize(decoded_len as u64),
                &CodecOptions::default(),
            )
            .map_err(|e| crate::Error::format(format!("could not decompress block: {e}")))?
            .into_owned(),
    };
    if decoded.len() != decoded_len {
        return Err(crate::Error::format(format!(
            "block payload has {} bytes, expected {decoded_len}",
            decoded.len()
        )));
    }
    Ok(decoded)
}
