use flate2::{Decompress, FlushDecompress};

use crate::error::{BgenError, Result};

/// Genotype-block compression scheme, from the two low bits of the header
/// flags. Uncompressed files carry no scheme at all, so the flag decodes
/// to an `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Zlib,
    Zstd,
}

impl Compression {
    pub(crate) fn from_flag(code: u8) -> Result<Option<Self>> {
        match code {
            0 => Ok(None),
            1 => Ok(Some(Compression::Zlib)),
            2 => Ok(Some(Compression::Zstd)),
            _ => Err(BgenError::UnsupportedCompression { code }),
        }
    }
}

/// Inflates `src` into `dst` and returns the number of bytes written.
///
/// `dst` must be sized to the expected decompressed length; producing any
/// other number of bytes is reported by the caller as a size mismatch.
pub(crate) fn decompress_into(compression: Compression, src: &[u8], dst: &mut [u8]) -> Result<usize> {
    match compression {
        Compression::Zlib => {
            let mut inflater = Decompress::new(true);
            inflater
                .decompress(src, dst, FlushDecompress::Finish)
                .map_err(|e| BgenError::Decompress {
                    detail: e.to_string(),
                })?;
            Ok(inflater.total_out() as usize)
        }
        Compression::Zstd => {
            zstd::bulk::decompress_to_buffer(src, dst).map_err(|e| BgenError::Decompress {
                detail: e.to_string(),
            })
        }
    }
}
