use std::io::SeekFrom;

use crate::error::{BgenError, Result};
use crate::file::{BgenFile, Layout};
use crate::io;
use crate::string::BgenString;

/// Per-variant metadata, as stored in the variant stream and in the
/// metafile. `allele_ids` always holds exactly `nalleles` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMetadata {
    /// Absolute byte offset of the variant's genotype block in the BGEN
    /// file.
    pub genotype_offset: u64,
    pub id: BgenString,
    pub rsid: BgenString,
    pub chrom: BgenString,
    pub position: u32,
    pub nalleles: u16,
    pub allele_ids: Vec<BgenString>,
}

/// Lazy single-pass iterator over the variant headers of an open file.
///
/// Genotype payloads are skipped, not decoded; each yielded record carries
/// the payload's byte offset for a later [`BgenFile::open_genotype`].
pub struct VariantReader<'a> {
    file: &'a mut BgenFile,
    next_idx: u32,
    nvariants: u32,
}

impl<'a> VariantReader<'a> {
    pub(crate) fn new(file: &'a mut BgenFile) -> Result<Self> {
        file.seek_to_variants()?;
        let nvariants = file.nvariants();
        Ok(Self {
            file,
            next_idx: 0,
            nvariants,
        })
    }

    fn read_u16(&mut self) -> Result<u16> {
        let r = io::read_u16(self.file.stream());
        self.file.read_ctx(r)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let r = io::read_u32(self.file.stream());
        self.file.read_ctx(r)
    }

    fn read_string(&mut self, prefix_len: usize) -> Result<BgenString> {
        let r = io::read_string(self.file.stream(), prefix_len);
        self.file.read_ctx(r)
    }

    fn skip(&mut self, nbytes: i64) -> Result<()> {
        let r = std::io::Seek::seek(self.file.stream(), SeekFrom::Current(nbytes));
        self.file.read_ctx(r)?;
        Ok(())
    }

    fn read_one(&mut self) -> Result<VariantMetadata> {
        // Layout 1 repeats the sample count in front of every variant
        if self.file.layout() == Layout::One {
            let nsamples = self.read_u32()?;
            if nsamples != self.file.nsamples() {
                return Err(BgenError::SampleCountMismatch {
                    expected: self.file.nsamples(),
                    found: nsamples,
                });
            }
        }

        let id = self.read_string(2)?;
        let rsid = self.read_string(2)?;
        let chrom = self.read_string(2)?;
        let position = self.read_u32()?;
        let nalleles = match self.file.layout() {
            Layout::One => 2,
            Layout::Two => self.read_u16()?,
        };

        let mut allele_ids = Vec::with_capacity(nalleles as usize);
        for _ in 0..nalleles {
            allele_ids.push(self.read_string(4)?);
        }

        let genotype_offset = {
            let r = std::io::Seek::stream_position(self.file.stream());
            self.file.read_ctx(r)?
        };
        self.skip_genotype_block()?;

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

    fn skip_genotype_block(&mut self) -> Result<()> {
        match self.file.layout() {
            Layout::One => {
                if self.file.compression().is_none() {
                    // Fixed 16-bit triplets, no length prefix
                    self.skip(6 * self.file.nsamples() as i64)
                } else {
                    let compressed_size = self.read_u32()?;
                    self.skip(compressed_size as i64)
                }
            }
            Layout::Two => {
                let block_size = self.read_u32()?;
                self.skip(block_size as i64)
            }
        }
    }
}

impl Iterator for VariantReader<'_> {
    type Item = Result<VariantMetadata>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_idx >= self.nvariants {
            return None;
        }
        match self.read_one() {
            Ok(metadata) => {
                self.next_idx += 1;
                Some(Ok(metadata))
            }
            Err(e) => {
                // Poison iterator to prevent further reads
                self.next_idx = self.nvariants;
                Some(Err(e))
            }
        }
    }
}
