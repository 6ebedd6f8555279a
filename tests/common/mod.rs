#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const BGEN_MAGIC: u32 = 1852139362;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Fresh path under the system temp directory, unique per test invocation.
pub fn scratch_path(label: &str) -> PathBuf {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join("bgen-reader-tests");
    fs::create_dir_all(&dir).unwrap();
    dir.join(format!("{}-{}-{}", std::process::id(), id, label))
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    None,
    Zlib,
    Zstd,
}

impl Codec {
    fn flag(self) -> u32 {
        match self {
            Codec::None => 0,
            Codec::Zlib => 1,
            Codec::Zstd => 2,
        }
    }

    fn compress(self, payload: &[u8]) -> Vec<u8> {
        match self {
            Codec::None => payload.to_vec(),
            Codec::Zlib => {
                let mut encoder =
                    flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(payload).unwrap();
                encoder.finish().unwrap()
            }
            Codec::Zstd => zstd::bulk::compress(payload, 0).unwrap(),
        }
    }
}

pub struct Layout1Variant {
    pub id: String,
    pub rsid: String,
    pub chrom: String,
    pub position: u32,
    pub alleles: [String; 2],
    /// One `(a, b, c)` triplet per sample; the all-zero triplet marks a
    /// missing sample.
    pub triplets: Vec<[u16; 3]>,
}

pub struct Layout2Variant {
    pub id: String,
    pub rsid: String,
    pub chrom: String,
    pub position: u32,
    pub alleles: Vec<String>,
    pub phased: bool,
    pub nbits: u8,
    pub samples: Vec<SampleGeno>,
}

#[derive(Clone)]
pub struct SampleGeno {
    pub ploidy: u8,
    pub missing: bool,
    /// The stored probability integers: `ploidy * (nalleles - 1)` values
    /// when phased, `ngenotypes - 1` values when unphased. Written to the
    /// bitstream even for missing samples, mirroring real producers.
    pub values: Vec<u32>,
}

impl SampleGeno {
    pub fn unphased(ploidy: u8, values: &[u32]) -> Self {
        Self {
            ploidy,
            missing: false,
            values: values.to_vec(),
        }
    }

    pub fn phased(ploidy: u8, values: &[u32]) -> Self {
        Self::unphased(ploidy, values)
    }

    pub fn missing(ploidy: u8, values: &[u32]) -> Self {
        Self {
            ploidy,
            missing: true,
            values: values.to_vec(),
        }
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_str(out: &mut Vec<u8>, s: &str, prefix_len: usize) {
    let prefix = (s.len() as u32).to_le_bytes();
    out.extend_from_slice(&prefix[..prefix_len]);
    out.extend_from_slice(s.as_bytes());
}

/// LSB-first bit packer matching the layout-2 probability encoding.
pub struct BitPacker {
    bytes: Vec<u8>,
    pos: usize,
}

impl BitPacker {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            pos: 0,
        }
    }

    pub fn push(&mut self, value: u32, nbits: u8) {
        for i in 0..nbits as usize {
            if self.pos % 8 == 0 {
                self.bytes.push(0);
            }
            let bit = (value >> i) & 1;
            self.bytes[self.pos / 8] |= (bit as u8) << (self.pos % 8);
            self.pos += 1;
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Offset field, fixed header, flags, and the optional sample block.
pub fn file_header(
    nvariants: u32,
    nsamples: u32,
    layout: u32,
    codec: Codec,
    samples: Option<&[&str]>,
    magic: u32,
) -> Vec<u8> {
    let mut sample_block = Vec::new();
    if let Some(ids) = samples {
        assert_eq!(ids.len(), nsamples as usize);
        let block_len = 8 + ids.iter().map(|s| 2 + s.len() as u32).sum::<u32>();
        put_u32(&mut sample_block, block_len);
        put_u32(&mut sample_block, nsamples);
        for id in ids {
            put_str(&mut sample_block, id, 2);
        }
    }

    let header_length = 20u32;
    // Distance from byte 4 to the first variant header
    let variants_offset = header_length + sample_block.len() as u32;

    let mut out = Vec::new();
    put_u32(&mut out, variants_offset);
    put_u32(&mut out, header_length);
    put_u32(&mut out, nvariants);
    put_u32(&mut out, nsamples);
    put_u32(&mut out, magic);
    let contain = if samples.is_some() { 1u32 << 31 } else { 0 };
    put_u32(&mut out, codec.flag() | (layout << 2) | contain);
    out.extend_from_slice(&sample_block);
    out
}

pub fn write_layout1_file(
    label: &str,
    nsamples: u32,
    samples: Option<&[&str]>,
    variants: &[Layout1Variant],
    codec: Codec,
) -> PathBuf {
    assert!(codec != Codec::Zstd, "layout 1 supports none/zlib only");
    let mut out = file_header(
        variants.len() as u32,
        nsamples,
        1,
        codec,
        samples,
        BGEN_MAGIC,
    );

    for variant in variants {
        assert_eq!(variant.triplets.len(), nsamples as usize);
        put_u32(&mut out, nsamples);
        put_str(&mut out, &variant.id, 2);
        put_str(&mut out, &variant.rsid, 2);
        put_str(&mut out, &variant.chrom, 2);
        put_u32(&mut out, variant.position);
        put_str(&mut out, &variant.alleles[0], 4);
        put_str(&mut out, &variant.alleles[1], 4);

        let mut payload = Vec::with_capacity(6 * nsamples as usize);
        for triplet in &variant.triplets {
            for &value in triplet {
                put_u16(&mut payload, value);
            }
        }
        match codec {
            Codec::None => out.extend_from_slice(&payload),
            _ => {
                let compressed = codec.compress(&payload);
                put_u32(&mut out, compressed.len() as u32);
                out.extend_from_slice(&compressed);
            }
        }
    }

    let path = scratch_path(label);
    fs::write(&path, out).unwrap();
    path
}

pub fn write_layout2_file(
    label: &str,
    nsamples: u32,
    samples: Option<&[&str]>,
    variants: &[Layout2Variant],
    codec: Codec,
) -> PathBuf {
    let mut out = file_header(
        variants.len() as u32,
        nsamples,
        2,
        codec,
        samples,
        BGEN_MAGIC,
    );

    for variant in variants {
        assert_eq!(variant.samples.len(), nsamples as usize);
        put_str(&mut out, &variant.id, 2);
        put_str(&mut out, &variant.rsid, 2);
        put_str(&mut out, &variant.chrom, 2);
        put_u32(&mut out, variant.position);
        put_u16(&mut out, variant.alleles.len() as u16);
        for allele in &variant.alleles {
            put_str(&mut out, allele, 4);
        }

        let payload = layout2_payload(nsamples, variant);
        match codec {
            Codec::None => {
                put_u32(&mut out, payload.len() as u32);
                out.extend_from_slice(&payload);
            }
            _ => {
                let compressed = codec.compress(&payload);
                put_u32(&mut out, compressed.len() as u32 + 4);
                put_u32(&mut out, payload.len() as u32);
                out.extend_from_slice(&compressed);
            }
        }
    }

    let path = scratch_path(label);
    fs::write(&path, out).unwrap();
    path
}

fn layout2_payload(nsamples: u32, variant: &Layout2Variant) -> Vec<u8> {
    let min_ploidy = variant.samples.iter().map(|s| s.ploidy).min().unwrap();
    let max_ploidy = variant.samples.iter().map(|s| s.ploidy).max().unwrap();

    let mut payload = Vec::new();
    put_u32(&mut payload, nsamples);
    put_u16(&mut payload, variant.alleles.len() as u16);
    payload.push(min_ploidy);
    payload.push(max_ploidy);
    for sample in &variant.samples {
        payload.push(((sample.missing as u8) << 7) | sample.ploidy);
    }
    payload.push(variant.phased as u8);
    payload.push(variant.nbits);

    let mut packer = BitPacker::new();
    for sample in &variant.samples {
        for &value in &sample.values {
            packer.push(value, variant.nbits);
        }
    }
    payload.extend_from_slice(&packer.into_bytes());
    payload
}

fn choose(n: u64, k: u64) -> u64 {
    let k = k.min(n - k);
    let mut result = 1u64;
    for i in 0..k {
        result = result * (n - i) / (i + 1);
    }
    result
}

/// Number of stored genotypes for an unphased sample.
pub fn multiset_count(nalleles: usize, ploidy: u8) -> usize {
    choose(nalleles as u64 + ploidy as u64 - 1, nalleles as u64 - 1) as usize
}

fn allele_id(index: usize) -> String {
    match index {
        0 => "A".to_string(),
        1 => "G".to_string(),
        longer => format!("G{}", "T".repeat(longer - 1)),
    }
}

pub const COMPLEX_NSAMPLES: u32 = 4;
pub const COMPLEX_SAMPLE_IDS: [&str; 4] = ["sample_0", "sample_1", "sample_2", "sample_3"];

/// Ten-variant cohort of four samples mixing phased and unphased variants,
/// multiallelic sites, and per-sample ploidies from 1 to 4.
pub fn complex_dataset(nbits: u8) -> Vec<Layout2Variant> {
    let nalleles = [2usize, 2, 2, 3, 2, 4, 6, 7, 8, 2];
    let phased = [
        false, true, true, false, true, true, true, true, false, false,
    ];
    let ploidies: [[u8; 4]; 10] = [
        [1, 2, 2, 2],
        [1, 1, 1, 1],
        [1, 2, 2, 2],
        [1, 2, 2, 2],
        [1, 3, 3, 2],
        [1, 1, 1, 1],
        [1, 1, 1, 1],
        [1, 1, 1, 1],
        [1, 1, 1, 2],
        [4, 4, 4, 4],
    ];
    let rsids = ["V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "M10"];
    let positions = [1u32, 2, 3, 4, 5, 7, 7, 8, 9, 10];

    (0..10)
        .map(|v| {
            let k = nalleles[v];
            let samples = (0..4)
                .map(|s| {
                    let ploidy = ploidies[v][s];
                    let nvalues = if phased[v] {
                        ploidy as usize * (k - 1)
                    } else {
                        multiset_count(k, ploidy) - 1
                    };
                    // Small deterministic values so every row sum stays
                    // well below 1
                    let values: Vec<u32> = (0..nvalues)
                        .map(|j| ((v * 131 + s * 17 + j * 7) % 1000) as u32 + 1)
                        .collect();
                    SampleGeno::unphased(ploidy, &values)
                })
                .collect();
            Layout2Variant {
                id: format!("SNPID_{}", v + 1),
                rsid: rsids[v].to_string(),
                chrom: "01".to_string(),
                position: positions[v],
                alleles: (0..k).map(allele_id).collect(),
                phased: phased[v],
                nbits,
                samples,
            }
        })
        .collect()
}

/// Expected decoded row for an unphased sample, NaN-padded to `ncombs`.
pub fn expected_unphased_row(sample: &SampleGeno, nbits: u8, ncombs: usize) -> Vec<f64> {
    if sample.missing || sample.ploidy == 0 {
        return vec![f64::NAN; ncombs];
    }
    let denom = ((1u64 << nbits) - 1) as f64;
    let mut row = Vec::with_capacity(ncombs);
    let mut sum = 0.0;
    for &value in &sample.values {
        let p = value as f64 / denom;
        row.push(p);
        sum += p;
    }
    row.push(1.0 - sum);
    row.resize(ncombs, f64::NAN);
    row
}

/// Expected decoded row for a phased sample, NaN-padded to
/// `nalleles * max_ploidy`.
pub fn expected_phased_row(
    sample: &SampleGeno,
    nalleles: usize,
    nbits: u8,
    ncombs: usize,
) -> Vec<f64> {
    if sample.missing {
        return vec![f64::NAN; ncombs];
    }
    let denom = ((1u64 << nbits) - 1) as f64;
    let mut row = Vec::with_capacity(ncombs);
    for hap in 0..sample.ploidy as usize {
        let mut sum = 0.0;
        for j in 0..nalleles - 1 {
            let p = sample.values[hap * (nalleles - 1) + j] as f64 / denom;
            row.push(p);
            sum += p;
        }
        row.push(1.0 - sum);
    }
    row.resize(ncombs, f64::NAN);
    row
}

pub fn assert_rows_match(found: &[f64], expected: &[f64]) {
    assert_eq!(found.len(), expected.len());
    for (i, (&f, &e)) in found.iter().zip(expected).enumerate() {
        if e.is_nan() {
            assert!(f.is_nan(), "slot {i}: expected NaN, found {f}");
        } else {
            assert!((f - e).abs() < 1e-10, "slot {i}: expected {e}, found {f}");
        }
    }
}
