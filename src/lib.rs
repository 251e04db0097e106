//! # FracMinHash sketches and evolutionary distances for genomic sequences.
//!
//! fmhdist decomposes FASTA files into canonical k-mers, keeps the hashes
//! that fall below a threshold set by the scaling parameter, and compares
//! the resulting sketches with bias corrected Jaccard and containment
//! estimates. Those estimates are turned into evolutionary distances
//! (including the Mash distance).
//!
//! Sketches have a fixed little-endian binary encoding, optionally stored
//! as hex text, so they can be computed once and compared many times.
//! Many inputs can be sketched concurrently with [`batch::BatchSketcher`].

pub mod errors;
pub use errors::FmhError as Error;

pub mod batch;
pub mod cmd;
pub mod distance;
pub mod encodings;
pub mod kmers;
pub mod prelude;
pub mod sketch;
pub mod storage;

pub type Result<T> = std::result::Result<T, Error>;
