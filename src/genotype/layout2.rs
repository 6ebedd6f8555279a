//! Layout-2 genotype blocks: per-sample ploidy and missingness, phased or
//! unphased probabilities at 1..=32 bits each, zlib/zstd or raw.

use itertools::izip;
use std::io::{Cursor, Read};

use super::{Genotype, LayoutData};
use crate::bits::BitReader;
use crate::compress;
use crate::error::{BgenError, Result};
use crate::file::BgenFile;
use crate::io;

const PLOIDY_MASK: u8 = 0b0011_1111;

pub(super) fn read_header(file: &mut BgenFile) -> Result<Genotype> {
    let total_block_size = {
        let r = io::read_u32(file.stream());
        file.read_ctx(r)?
    };

    let chunk = match file.compression() {
        None => {
            let mut chunk = vec![0u8; total_block_size as usize];
            let r = file.stream().read_exact(&mut chunk);
            file.read_ctx(r)?;
            chunk
        }
        Some(compression) => {
            let uncompressed_size = {
                let r = io::read_u32(file.stream());
                file.read_ctx(r)?
            };
            let compressed_size =
                total_block_size
                    .checked_sub(4)
                    .ok_or_else(|| BgenError::Decompress {
                        detail: format!("block size {total_block_size} too small for its header"),
                    })?;
            let mut compressed = vec![0u8; compressed_size as usize];
            let r = file.stream().read_exact(&mut compressed);
            file.read_ctx(r)?;

            let mut chunk = vec![0u8; uncompressed_size as usize];
            let written = compress::decompress_into(compression, &compressed, &mut chunk)?;
            if written != chunk.len() {
                return Err(BgenError::DecompressedSize {
                    expected: chunk.len(),
                    found: written,
                });
            }
            chunk
        }
    };

    // The payload carries its own header; parse it in-buffer
    let mut cursor = Cursor::new(chunk.as_slice());

    let nsamples = file.read_ctx(io::read_u32(&mut cursor))?;
    if nsamples != file.nsamples() {
        return Err(BgenError::SampleCountMismatch {
            expected: file.nsamples(),
            found: nsamples,
        });
    }
    let nalleles = file.read_ctx(io::read_u16(&mut cursor))?;
    if nalleles < 2 {
        return Err(BgenError::AlleleCount { nalleles });
    }
    let min_ploidy = file.read_ctx(io::read_u8(&mut cursor))?;
    let max_ploidy = file.read_ctx(io::read_u8(&mut cursor))?;

    let mut ploidy = Vec::with_capacity(nsamples as usize);
    let mut missing = Vec::with_capacity(nsamples as usize);
    for _ in 0..nsamples {
        let byte = file.read_ctx(io::read_u8(&mut cursor))?;
        let sample_ploidy = byte & PLOIDY_MASK;
        if sample_ploidy < min_ploidy || sample_ploidy > max_ploidy {
            return Err(BgenError::PloidyOutOfRange {
                ploidy: sample_ploidy,
                min_ploidy,
                max_ploidy,
            });
        }
        missing.push((byte >> 7) & 1 == 1);
        ploidy.push(sample_ploidy);
    }

    let phased = match file.read_ctx(io::read_u8(&mut cursor))? {
        0 => false,
        1 => true,
        value => return Err(BgenError::InvalidPhasedFlag { value }),
    };
    let nbits = file.read_ctx(io::read_u8(&mut cursor))?;
    if !(1..=32).contains(&nbits) {
        return Err(BgenError::InvalidProbabilityBits { nbits });
    }

    let probs_start = cursor.position() as usize;
    let ncombs = ncombs(nalleles, max_ploidy, phased);

    Ok(Genotype {
        nsamples,
        nalleles,
        min_ploidy,
        max_ploidy,
        phased,
        nbits,
        ncombs,
        ploidy,
        missing,
        data: LayoutData::Two { chunk, probs_start },
    })
}

pub(super) fn read(genotype: &Genotype, probs: &[u8], out: &mut [f64]) -> Result<()> {
    let nbits = genotype.nbits;
    let denom = ((1u64 << nbits) - 1) as f64;
    let nalleles = genotype.nalleles as usize;
    let ncombs = genotype.ncombs as usize;
    let mut bits = BitReader::new(probs);

    for (&ploidy, &missing, row) in izip!(
        &genotype.ploidy,
        &genotype.missing,
        out.chunks_exact_mut(ncombs)
    ) {
        if genotype.phased {
            read_phased_row(&mut bits, ploidy, missing, nalleles, nbits, denom, row)?;
        } else {
            read_unphased_row(&mut bits, ploidy, missing, nalleles, nbits, denom, row)?;
        }
    }
    Ok(())
}

/// One probability per allele per haplotype; the last allele of each
/// haplotype is derived from the complement.
fn read_phased_row(
    bits: &mut BitReader<'_>,
    ploidy: u8,
    missing: bool,
    nalleles: usize,
    nbits: u8,
    denom: f64,
    row: &mut [f64],
) -> Result<()> {
    if missing {
        // Keep subsequent samples aligned with the bitstream
        bits.skip(ploidy as usize * (nalleles - 1) * nbits as usize)?;
        row.fill(f64::NAN);
        return Ok(());
    }

    let mut slot = 0;
    for _ in 0..ploidy {
        let mut sum = 0.0;
        for _ in 0..nalleles - 1 {
            let p = bits.read(nbits)? as f64 / denom;
            row[slot] = p;
            slot += 1;
            sum += p;
        }
        row[slot] = 1.0 - sum;
        slot += 1;
    }
    // Haplotype slots beyond this sample's ploidy are padding
    row[slot..].fill(f64::NAN);
    Ok(())
}

/// One probability per genotype multiset; the count depends on the
/// sample's own ploidy, and rows narrower than the variant-wide width are
/// NaN-padded.
fn read_unphased_row(
    bits: &mut BitReader<'_>,
    ploidy: u8,
    missing: bool,
    nalleles: usize,
    nbits: u8,
    denom: f64,
    row: &mut [f64],
) -> Result<()> {
    if ploidy == 0 {
        row.fill(f64::NAN);
        return Ok(());
    }

    let ngenotypes = multiset_count(nalleles as u16, ploidy) as usize;
    if missing {
        bits.skip((ngenotypes - 1) * nbits as usize)?;
        row.fill(f64::NAN);
        return Ok(());
    }

    let mut sum = 0.0;
    for slot in row.iter_mut().take(ngenotypes - 1) {
        let p = bits.read(nbits)? as f64 / denom;
        *slot = p;
        sum += p;
    }
    row[ngenotypes - 1] = 1.0 - sum;
    row[ngenotypes..].fill(f64::NAN);
    Ok(())
}

/// Row width per sample: `nalleles` probabilities per haplotype when
/// phased, multiset count over the maximum ploidy when unphased.
fn ncombs(nalleles: u16, max_ploidy: u8, phased: bool) -> u32 {
    if phased {
        nalleles as u32 * max_ploidy as u32
    } else {
        multiset_count(nalleles, max_ploidy)
    }
}

/// Number of multisets of size `ploidy` drawn from `nalleles` alleles:
/// `C(nalleles + ploidy - 1, nalleles - 1)`.
fn multiset_count(nalleles: u16, ploidy: u8) -> u32 {
    choose(nalleles as u64 + ploidy as u64 - 1, nalleles as u64 - 1) as u32
}

fn choose(n: u64, k: u64) -> u64 {
    let k = k.min(n - k);
    let mut result = 1u64;
    for i in 0..k {
        result = result * (n - i) / (i + 1);
    }
    result
}
