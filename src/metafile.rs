//! Sidecar index over a BGEN variant stream.
//!
//! The metafile is written in one pass over the variant headers and lets
//! later queries seek straight to any variant's genotype block. On-disk
//! layout:
//!
//! ```text
//! signature       : 13 bytes, "bgen index 03"
//! nvariants       : u32
//! metadata size   : u64
//! metadata region : one record per variant
//! npartitions     : u32
//! offsets         : npartitions x u64, relative to the metadata region
//! ```
//!
//! Each record stores the genotype offset, id/rsid/chrom, position,
//! and the allele ids of one variant.

use log::debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{BgenError, Result};
use crate::file::BgenFile;
use crate::io;
use crate::variant::VariantMetadata;

const SIGNATURE: &[u8; 13] = b"bgen index 03";
/// Signature + nvariants + metadata size; the metadata region starts here.
const HEADER_LEN: u64 = 13 + 4 + 8;

/// An open metafile: validated signature, partition table in memory,
/// metadata region read on demand.
#[derive(Debug)]
pub struct Metafile {
    path: PathBuf,
    stream: BufReader<File>,
    nvariants: u32,
    npartitions: u32,
    partition_offset: Vec<u64>,
}

/// One partition's worth of variant metadata, materialized in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    variants: Vec<VariantMetadata>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VariantMetadata> {
        self.variants.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VariantMetadata> {
        self.variants.iter()
    }
}

impl IntoIterator for Partition {
    type Item = VariantMetadata;
    type IntoIter = std::vec::IntoIter<VariantMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.into_iter()
    }
}

impl Metafile {
    /// Walks the whole variant stream of `bgen` once and writes the index
    /// to `path`, split into `npartitions` equal-size ranges. Returns the
    /// opened metafile.
    ///
    /// No partial metafile is valid: on error the caller should delete the
    /// target path.
    pub fn create(bgen: &mut BgenFile, path: impl AsRef<Path>, npartitions: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if npartitions == 0 {
            return Err(BgenError::PartitionCount { npartitions });
        }

        let f = File::create(&path).map_err(|e| BgenError::Open {
            source: e,
            path: path.clone(),
        })?;
        let mut writer = BufWriter::new(f);

        let nvariants = bgen.nvariants();
        write_ctx(writer.write_all(SIGNATURE), &path)?;
        write_ctx(io::write_u32(&mut writer, nvariants), &path)?;
        // Reserved slot for the metadata-region size, patched below
        write_ctx(io::write_u64(&mut writer, 0), &path)?;

        debug!(
            "indexing {} variants into {} partition(s) at {}",
            nvariants,
            npartitions,
            path.display()
        );

        let part_size = nvariants.div_ceil(npartitions);
        let mut offsets: Vec<u64> = Vec::with_capacity(npartitions as usize);
        let mut cursor: u64 = 0;

        for (i, variant) in bgen.variants()?.enumerate() {
            let variant = variant?;
            if i as u32 % part_size == 0 {
                offsets.push(cursor);
            }
            cursor += write_variant(&mut writer, &variant, &path)?;
        }
        // Empty trailing partitions when npartitions exceeds nvariants
        while offsets.len() < npartitions as usize {
            offsets.push(cursor);
        }
        let metadata_size = cursor;

        write_ctx(io::write_u32(&mut writer, npartitions), &path)?;
        for &offset in &offsets {
            write_ctx(io::write_u64(&mut writer, offset), &path)?;
        }

        // Patch the reserved slot now that the region size is known
        write_ctx(writer.seek(SeekFrom::Start(13 + 4)), &path)?;
        write_ctx(io::write_u64(&mut writer, metadata_size), &path)?;
        let f = writer.into_inner().map_err(|e| BgenError::Write {
            source: e.into_error(),
            path: path.clone(),
        })?;
        write_ctx(f.sync_all(), &path)?;
        drop(f);

        Self::open(path)
    }

    /// Opens an existing metafile, validating its signature and loading the
    /// partition table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let f = File::open(&path).map_err(|e| BgenError::Open {
            source: e,
            path: path.clone(),
        })?;
        let mut stream = BufReader::new(f);

        let mut signature = [0u8; 13];
        read_ctx(stream.read_exact(&mut signature), &path)?;
        if &signature != SIGNATURE {
            return Err(BgenError::MetafileSignature {
                found: String::from_utf8_lossy(&signature).into_owned(),
            });
        }

        let nvariants = read_ctx(io::read_u32(&mut stream), &path)?;
        let metadata_size = read_ctx(io::read_u64(&mut stream), &path)?;
        if metadata_size > i64::MAX as u64 {
            return Err(BgenError::OffsetOverflow {
                offset: metadata_size,
            });
        }
        read_ctx(stream.seek(SeekFrom::Current(metadata_size as i64)), &path)?;

        let npartitions = read_ctx(io::read_u32(&mut stream), &path)?;
        let mut partition_offset = Vec::with_capacity(npartitions as usize);
        for _ in 0..npartitions {
            partition_offset.push(read_ctx(io::read_u64(&mut stream), &path)?);
        }

        Ok(Self {
            path,
            stream,
            nvariants,
            npartitions,
            partition_offset,
        })
    }

    pub fn npartitions(&self) -> u32 {
        self.npartitions
    }

    pub fn nvariants(&self) -> u32 {
        self.nvariants
    }

    /// Number of variants in partition `index`.
    pub fn partition_nvariants(&self, index: u32) -> Result<u32> {
        if index >= self.npartitions {
            return Err(BgenError::PartitionOutOfRange {
                index,
                npartitions: self.npartitions,
            });
        }
        let part_size = self.nvariants.div_ceil(self.npartitions);
        let remaining = (self.nvariants as u64).saturating_sub(part_size as u64 * index as u64);
        Ok(part_size.min(remaining as u32))
    }

    /// Materializes partition `index` into an owned array of variant
    /// metadata.
    pub fn read_partition(&mut self, index: u32) -> Result<Partition> {
        let nvars = self.partition_nvariants(index)?;

        let offset = self.partition_offset[index as usize];
        let start = HEADER_LEN
            .checked_add(offset)
            .ok_or(BgenError::OffsetOverflow { offset })?;
        if start > i64::MAX as u64 {
            return Err(BgenError::OffsetOverflow { offset: start });
        }
        read_ctx(self.stream.seek(SeekFrom::Start(start)), &self.path)?;

        let mut variants = Vec::with_capacity(nvars as usize);
        for _ in 0..nvars {
            variants.push(read_variant(&mut self.stream, &self.path)?);
        }
        Ok(Partition { variants })
    }
}

fn write_variant(
    writer: &mut BufWriter<File>,
    variant: &VariantMetadata,
    path: &Path,
) -> Result<u64> {
    write_ctx(io::write_u64(writer, variant.genotype_offset), path)?;
    write_ctx(io::write_string(writer, &variant.id, 2), path)?;
    write_ctx(io::write_string(writer, &variant.rsid, 2), path)?;
    write_ctx(io::write_string(writer, &variant.chrom, 2), path)?;
    write_ctx(io::write_u32(writer, variant.position), path)?;
    write_ctx(io::write_u16(writer, variant.nalleles), path)?;

    let mut size = 8 + 2 + 2 + 2 + 4 + 2
        + (variant.id.len() + variant.rsid.len() + variant.chrom.len()) as u64;
    for allele in &variant.allele_ids {
        write_ctx(io::write_string(writer, allele, 4), path)?;
        size += 4 + allele.len() as u64;
    }
    Ok(size)
}

fn read_variant(stream: &mut BufReader<File>, path: &Path) -> Result<VariantMetadata> {
    let genotype_offset = read_ctx(io::read_u64(stream), path)?;
    let id = read_ctx(io::read_string(stream, 2), path)?;
    let rsid = read_ctx(io::read_string(stream, 2), path)?;
    let chrom = read_ctx(io::read_string(stream, 2), path)?;
    let position = read_ctx(io::read_u32(stream), path)?;
    let nalleles = read_ctx(io::read_u16(stream), path)?;

    let mut allele_ids = Vec::with_capacity(nalleles as usize);
    for _ in 0..nalleles {
        allele_ids.push(read_ctx(io::read_string(stream, 4), path)?);
    }

    Ok(VariantMetadata {
        genotype_offset,
        id,
        rsid,
        chrom,
        position,
        nalleles,
        allele_ids,
    })
}

fn read_ctx<T>(result: std::io::Result<T>, path: &Path) -> Result<T> {
    result.map_err(|e| BgenError::Read {
        source: e,
        path: path.to_path_buf(),
    })
}

fn write_ctx<T>(result: std::io::Result<T>, path: &Path) -> Result<T> {
    result.map_err(|e| BgenError::Write {
        source: e,
        path: path.to_path_buf(),
    })
}
