//! Layout-1 genotype blocks: three 16-bit probabilities per sample,
//! always diploid, never phased, optionally zlib-compressed as a whole.

use itertools::izip;
use std::io::Read;

use super::{Genotype, LayoutData};
use crate::compress;
use crate::error::{BgenError, Result};
use crate::file::BgenFile;
use crate::io;

const BYTES_PER_SAMPLE: usize = 6;
const DENOM: f64 = 65535.0;

pub(super) fn read_header(file: &mut BgenFile) -> Result<Genotype> {
    let nsamples = file.nsamples();
    let chunk_len = BYTES_PER_SAMPLE * nsamples as usize;
    let mut chunk = vec![0u8; chunk_len];

    match file.compression() {
        None => {
            let r = file.stream().read_exact(&mut chunk);
            file.read_ctx(r)?;
        }
        Some(compression) => {
            let compressed_size = {
                let r = io::read_u32(file.stream());
                file.read_ctx(r)?
            };
            let mut compressed = vec![0u8; compressed_size as usize];
            let r = file.stream().read_exact(&mut compressed);
            file.read_ctx(r)?;

            let written = compress::decompress_into(compression, &compressed, &mut chunk)?;
            if written != chunk_len {
                return Err(BgenError::DecompressedSize {
                    expected: chunk_len,
                    found: written,
                });
            }
        }
    }

    // The all-zero triplet is the missingness sentinel
    let missing = chunk
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|triplet| triplet.iter().all(|&b| b == 0))
        .collect();

    Ok(Genotype {
        nsamples,
        nalleles: 2,
        min_ploidy: 2,
        max_ploidy: 2,
        phased: false,
        nbits: 16,
        ncombs: 3,
        ploidy: vec![2; nsamples as usize],
        missing,
        data: LayoutData::One { chunk },
    })
}

pub(super) fn read(chunk: &[u8], out: &mut [f64]) -> Result<()> {
    for (triplet, row) in izip!(chunk.chunks_exact(BYTES_PER_SAMPLE), out.chunks_exact_mut(3)) {
        for (bytes, slot) in izip!(triplet.chunks_exact(2), row.iter_mut()) {
            *slot = u16::from_le_bytes([bytes[0], bytes[1]]) as f64 / DENOM;
        }
    }
    Ok(())
}
