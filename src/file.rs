use log::warn;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::compress::Compression;
use crate::error::{BgenError, Result};
use crate::genotype::Genotype;
use crate::io;
use crate::string::BgenString;
use crate::variant::VariantReader;

/// "bgen" as a little-endian u32.
const BGEN_MAGIC: u32 = 1852139362;
const FIXED_HEADER_LEN: i64 = 20;

/// On-disk layout version of the variant and genotype blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    One,
    Two,
}

/// An open BGEN file.
///
/// Header metadata is parsed once at open; the stream cursor is the only
/// mutable state afterwards. To decode variants from multiple threads, open
/// the path once per thread.
#[derive(Debug)]
pub struct BgenFile {
    path: PathBuf,
    stream: BufReader<File>,
    nvariants: u32,
    nsamples: u32,
    compression: Option<Compression>,
    layout: Layout,
    contain_samples: bool,
    samples_start: u64,
    variants_start: u64,
}

impl BgenFile {
    /// Opens a BGEN file and parses its header block.
    ///
    /// A magic-number mismatch is logged as a warning rather than treated as
    /// fatal; unknown layout or compression codes are errors.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let f = File::open(&path).map_err(|e| BgenError::Open {
            source: e,
            path: path.clone(),
        })?;
        let mut stream = BufReader::new(f);

        // The leading u32 gives the offset of the first variant header,
        // counted from the end of itself.
        let variants_start = with_path(io::read_u32(&mut stream), &path)? as u64 + 4;

        let header_length = with_path(io::read_u32(&mut stream), &path)?;
        let nvariants = with_path(io::read_u32(&mut stream), &path)?;
        let nsamples = with_path(io::read_u32(&mut stream), &path)?;
        let magic = with_path(io::read_u32(&mut stream), &path)?;
        if magic != BGEN_MAGIC {
            warn!("magic number mismatch in {}", path.display());
        }

        // Free data area between the fixed header and the flags
        with_path(
            stream.seek(SeekFrom::Current(header_length as i64 - FIXED_HEADER_LEN)),
            &path,
        )?;

        let flags = with_path(io::read_u32(&mut stream), &path)?;
        let compression = Compression::from_flag((flags & 0b11) as u8)?;
        let layout = match ((flags >> 2) & 0b1111) as u8 {
            1 => Layout::One,
            2 => Layout::Two,
            other => return Err(BgenError::UnsupportedLayout { layout: other }),
        };
        let contain_samples = (flags >> 31) & 1 == 1;

        let samples_start = with_path(stream.stream_position(), &path)?;

        Ok(Self {
            path,
            stream,
            nvariants,
            nsamples,
            compression,
            layout,
            contain_samples,
            samples_start,
            variants_start,
        })
    }

    pub fn nsamples(&self) -> u32 {
        self.nsamples
    }

    pub fn nvariants(&self) -> u32 {
        self.nvariants
    }

    pub fn contain_samples(&self) -> bool {
        self.contain_samples
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn compression(&self) -> Option<Compression> {
        self.compression
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the sample identifier block, or returns `None` when the file
    /// was written without one.
    pub fn read_samples(&mut self) -> Result<Option<Vec<BgenString>>> {
        if !self.contain_samples {
            warn!("{} does not contain sample ids", self.path.display());
            return Ok(None);
        }
        self.seek_to(self.samples_start)?;

        // Sub-header: block length, then a sample count that must agree
        // with the main header.
        let _block_length = with_path(io::read_u32(&mut self.stream), &self.path)?;
        let nsamples = with_path(io::read_u32(&mut self.stream), &self.path)?;
        if nsamples != self.nsamples {
            return Err(BgenError::SampleCountMismatch {
                expected: self.nsamples,
                found: nsamples,
            });
        }

        let mut samples = Vec::with_capacity(self.nsamples as usize);
        for _ in 0..self.nsamples {
            samples.push(with_path(io::read_string(&mut self.stream, 2), &self.path)?);
        }

        // The variant stream begins right after the sample block
        self.variants_start = with_path(self.stream.stream_position(), &self.path)?;
        Ok(Some(samples))
    }

    /// Positions the stream at the first variant header.
    pub fn seek_to_variants(&mut self) -> Result<()> {
        self.seek_to(self.variants_start)
    }

    /// Returns a single-pass iterator over the variant headers, positioned
    /// at the start of the variant stream.
    pub fn variants(&mut self) -> Result<VariantReader<'_>> {
        VariantReader::new(self)
    }

    /// Opens the genotype block recorded at `genotype_offset`, reading and
    /// decompressing its probability payload.
    pub fn open_genotype(&mut self, genotype_offset: u64) -> Result<Genotype> {
        Genotype::open(self, genotype_offset)
    }

    pub(crate) fn stream(&mut self) -> &mut BufReader<File> {
        &mut self.stream
    }

    pub(crate) fn seek_to(&mut self, offset: u64) -> Result<()> {
        if offset > i64::MAX as u64 {
            return Err(BgenError::OffsetOverflow { offset });
        }
        with_path(self.stream.seek(SeekFrom::Start(offset)), &self.path)?;
        Ok(())
    }

    pub(crate) fn read_ctx<T>(&self, result: std::io::Result<T>) -> Result<T> {
        with_path(result, &self.path)
    }
}

fn with_path<T>(result: std::io::Result<T>, path: &Path) -> Result<T> {
    result.map_err(|e| BgenError::Read {
        source: e,
        path: path.to_path_buf(),
    })
}
