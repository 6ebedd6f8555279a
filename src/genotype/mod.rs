mod layout1;
mod layout2;

use ndarray::Array2;

use crate::error::{BgenError, Result};
use crate::file::{BgenFile, Layout};

/// An opened variant genotype block.
///
/// The probability payload is read and decompressed once, at open;
/// [`Genotype::read`] only unpacks it, so repeated reads are cheap and
/// yield identical output. The handle does not keep a reference to the
/// file it was opened from.
pub struct Genotype {
    nsamples: u32,
    nalleles: u16,
    min_ploidy: u8,
    max_ploidy: u8,
    phased: bool,
    nbits: u8,
    ncombs: u32,
    ploidy: Vec<u8>,
    missing: Vec<bool>,
    data: LayoutData,
}

/// The two layouts share the handle but diverge entirely in decoding.
enum LayoutData {
    /// Fixed 16-bit triplets, always diploid, never phased.
    One { chunk: Vec<u8> },
    /// Variable-bit-width payload; `probs_start` is where the probability
    /// bitstream begins within `chunk`.
    Two { chunk: Vec<u8>, probs_start: usize },
}

impl Genotype {
    pub(crate) fn open(file: &mut BgenFile, genotype_offset: u64) -> Result<Self> {
        file.seek_to(genotype_offset)?;
        match file.layout() {
            Layout::One => layout1::read_header(file),
            Layout::Two => layout2::read_header(file),
        }
    }

    pub fn nsamples(&self) -> u32 {
        self.nsamples
    }

    pub fn nalleles(&self) -> u16 {
        self.nalleles
    }

    pub fn min_ploidy(&self) -> u8 {
        self.min_ploidy
    }

    pub fn max_ploidy(&self) -> u8 {
        self.max_ploidy
    }

    pub fn phased(&self) -> bool {
        self.phased
    }

    /// Bit width of each stored probability (16 for layout 1).
    pub fn nbits(&self) -> u8 {
        self.nbits
    }

    /// Number of probability entries per sample row. For layout 1 this is
    /// always 3; for phased layout 2 it is `nalleles * max_ploidy`; for
    /// unphased layout 2 it is the number of multisets of size
    /// `max_ploidy` over `nalleles` alleles.
    pub fn ncombs(&self) -> u32 {
        self.ncombs
    }

    pub fn ploidy(&self, index: u32) -> Result<u8> {
        self.check_sample(index)?;
        Ok(self.ploidy[index as usize])
    }

    pub fn missing(&self, index: u32) -> Result<bool> {
        self.check_sample(index)?;
        Ok(self.missing[index as usize])
    }

    /// Decodes the probabilities into `out`, a row-major
    /// `nsamples x ncombs` buffer. Rows of missing samples (and the padded
    /// tail of short-ploidy samples) are NaN-filled.
    pub fn read(&self, out: &mut [f64]) -> Result<()> {
        let expected = self.nsamples as usize * self.ncombs as usize;
        if out.len() != expected {
            return Err(BgenError::ProbabilityBufferSize {
                expected,
                found: out.len(),
            });
        }
        match &self.data {
            LayoutData::One { chunk } => layout1::read(chunk, out),
            LayoutData::Two { chunk, probs_start } => {
                layout2::read(self, &chunk[*probs_start..], out)
            }
        }
    }

    /// Allocating convenience over [`Genotype::read`].
    pub fn read_probabilities(&self) -> Result<Array2<f64>> {
        let shape = (self.nsamples as usize, self.ncombs as usize);
        let mut out = vec![0.0f64; shape.0 * shape.1];
        self.read(&mut out)?;
        Ok(Array2::from_shape_vec(shape, out).expect("buffer sized to shape"))
    }

    fn check_sample(&self, index: u32) -> Result<()> {
        if index >= self.nsamples {
            return Err(BgenError::SampleOutOfRange {
                index,
                nsamples: self.nsamples,
            });
        }
        Ok(())
    }
}
