use thiserror::Error;

#[derive(Debug, Error)]
pub enum BgenError {
    #[error("could not open {path}")]
    Open {
        #[source]
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[error("could not read {path}")]
    Read {
        #[source]
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[error("could not write to {path}")]
    Write {
        #[source]
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[error("unrecognized metafile signature: {found:?}")]
    MetafileSignature { found: String },

    #[error("unsupported layout code {layout}")]
    UnsupportedLayout { layout: u8 },

    #[error("unsupported compression code {code}")]
    UnsupportedCompression { code: u8 },

    #[error("sample count mismatch (header N={expected}, found {found})")]
    SampleCountMismatch { expected: u32, found: u32 },

    #[error("variant must have at least 2 alleles (got {nalleles})")]
    AlleleCount { nalleles: u16 },

    #[error("decompressed block size mismatch (expected {expected} bytes, found {found} bytes)")]
    DecompressedSize { expected: usize, found: usize },

    #[error("could not decompress block: {detail}")]
    Decompress { detail: String },

    #[error("probability bit width must be in 1..=32 (got {nbits})")]
    InvalidProbabilityBits { nbits: u8 },

    #[error("phased flag must be 0 or 1 (got {value})")]
    InvalidPhasedFlag { value: u8 },

    #[error("sample ploidy {ploidy} outside the declared range {min_ploidy}..={max_ploidy}")]
    PloidyOutOfRange {
        ploidy: u8,
        min_ploidy: u8,
        max_ploidy: u8,
    },

    #[error("probability bitstream ended before every sample was decoded")]
    BitstreamExhausted,

    #[error("need at least 1 partition (got {npartitions})")]
    PartitionCount { npartitions: u32 },

    #[error("partition index out-of-range: {index} >= {npartitions}")]
    PartitionOutOfRange { index: u32, npartitions: u32 },

    #[error("sample index out-of-range: {index} >= {nsamples}")]
    SampleOutOfRange { index: u32, nsamples: u32 },

    #[error("offset {offset} does not fit the platform seek type")]
    OffsetOverflow { offset: u64 },

    #[error("probability buffer length mismatch (expected {expected}, found {found})")]
    ProbabilityBufferSize { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, BgenError>;
