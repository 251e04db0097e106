use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use crate::cmd::ComputeParameters;
use crate::encodings::{canonical, HashFunctions};
use crate::kmers::{Kmer, KmerDecomposer, SymbolSource};
use crate::sketch::coordinates::Coordinate;
use crate::sketch::Sketch;
use crate::Error;

/// Marker at the start of every encoded sketch. Also hashed into the
/// hash function fingerprint.
pub const MAGIC: u32 = 1_213_415_759;

/// Hashes strictly below this value are kept.
///
/// Hashes are signed, so the full range is `[-2^63, 2^63)` and the lowest
/// `1/scaled` of it is retained. `scaled == 1` keeps every hash.
pub fn threshold_for_scaled(scaled: u32) -> i128 {
    let range: i128 = 1 << 64;
    i64::MIN as i128 + range / scaled as i128
}

/// Fingerprint of a hash function and seed pair.
pub fn hashed_magic_number_for(hash_function: HashFunctions, seed: u32) -> i64 {
    hash_function.hash_int(MAGIC, seed)
}

/// Accumulates retained hashes until [`SketchBuilder::build`] freezes them
/// into a [`Sketch`].
#[derive(Debug, Clone)]
pub struct SketchBuilder {
    ksize: u32,
    scaled: u32,
    seed: u32,
    hash_function: HashFunctions,
    threshold: i128,
    hashes: BTreeSet<i64>,
    coordinates: Option<BTreeMap<i64, Coordinate>>,
}

impl SketchBuilder {
    pub fn new(params: &ComputeParameters) -> Result<SketchBuilder, Error> {
        params.validate()?;

        Ok(SketchBuilder {
            ksize: params.ksize(),
            scaled: params.scaled(),
            seed: params.seed(),
            hash_function: params.hash_function(),
            threshold: threshold_for_scaled(params.scaled()),
            hashes: BTreeSet::new(),
            coordinates: if params.coordinates() {
                Some(BTreeMap::new())
            } else {
                None
            },
        })
    }

    pub fn ksize(&self) -> u32 {
        self.ksize
    }

    pub fn scaled(&self) -> u32 {
        self.scaled
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    #[inline]
    pub fn retains(&self, hash: i64) -> bool {
        (hash as i128) < self.threshold
    }

    /// Hash the canonical form of `kmer`. Returns the hash when it was kept.
    pub fn add_kmer(&mut self, kmer: &Kmer<'_>) -> Option<i64> {
        let canon = canonical(kmer.kmer, kmer.reverse_complement);
        let hash = self.hash_function.hash(canon, self.seed);

        if !self.add_hash(hash) {
            return None;
        }

        if let Some(coordinates) = self.coordinates.as_mut() {
            coordinates
                .entry(hash)
                .or_insert_with(|| Coordinate::new(&kmer.position, kmer.kmer, hash));
        }
        Some(hash)
    }

    /// Keep `hash` when it falls below the threshold.
    pub fn add_hash(&mut self, hash: i64) -> bool {
        if self.retains(hash) {
            self.hashes.insert(hash);
            true
        } else {
            false
        }
    }

    /// Drain every window of `kmers` into the builder.
    pub fn consume<S: SymbolSource>(&mut self, kmers: &mut KmerDecomposer<S>) -> Result<(), Error> {
        if kmers.k() != self.ksize as usize {
            return Err(Error::InvalidParameter {
                name: "ksize".into(),
                message: format!(
                    "decomposer uses k={} but the sketch expects k={}",
                    kmers.k(),
                    self.ksize
                ),
            });
        }

        let mut seen = 0usize;
        while let Some(kmer) = kmers.advance()? {
            self.add_kmer(&kmer);
            seen += 1;
        }
        trace!("consumed {} k-mers, kept {}", seen, self.hashes.len());
        Ok(())
    }

    pub fn build(self, name: Option<String>) -> Sketch {
        Sketch {
            name,
            ksize: self.ksize,
            scaled: self.scaled,
            seed: self.seed,
            hashed_magic_number: hashed_magic_number_for(self.hash_function, self.seed),
            values: self.hashes.into_iter().collect(),
            coordinates: self.coordinates.map(|c| c.into_values().collect()),
        }
    }
}
