//! Reader for BGEN genetic-variant files.
//!
//! Supports layouts 1 and 2, uncompressed, zlib, and zstd genotype blocks.
//! Typical flow: open a [`BgenFile`], build or open a [`Metafile`] sidecar
//! index, read a [`Partition`] of variant metadata, then open each
//! variant's genotype block by its recorded offset and decode the
//! probability rows.
//!
//! All handles are single-threaded; to decode variants in parallel, open
//! one [`BgenFile`] per thread.

mod bits;
pub mod compress;
pub mod error;
pub mod file;
pub mod genotype;
mod io;
pub mod metafile;
pub mod string;
pub mod variant;

pub use compress::Compression;
pub use error::{BgenError, Result};
pub use file::{BgenFile, Layout};
pub use genotype::Genotype;
pub use metafile::{Metafile, Partition};
pub use string::BgenString;
pub use variant::{VariantMetadata, VariantReader};
