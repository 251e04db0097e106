use std::convert::TryFrom;
use std::hash::Hasher;
use std::str::FromStr;

use metrohash::MetroHash64;
use murmurhash3::murmurhash3_x64_128;
use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::Error;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum HashFunctions {
    farm = 1,
    murmur3 = 2,
    metro = 3,
    xx64 = 4,
}

impl HashFunctions {
    pub fn supported() -> &'static [HashFunctions] {
        &[
            HashFunctions::farm,
            HashFunctions::murmur3,
            HashFunctions::metro,
            HashFunctions::xx64,
        ]
    }

    /// Hash `bytes` into the signed 64-bit range.
    pub fn hash(&self, bytes: &[u8], seed: u32) -> i64 {
        let seed = seed as u64;
        let h = match self {
            HashFunctions::farm => farmhash::hash64_with_seed(bytes, seed),
            HashFunctions::murmur3 => murmurhash3_x64_128(bytes, seed).0,
            HashFunctions::metro => {
                let mut hasher = MetroHash64::with_seed(seed);
                hasher.write(bytes);
                hasher.finish()
            }
            HashFunctions::xx64 => {
                let mut hasher = XxHash64::with_seed(seed);
                hasher.write(bytes);
                hasher.finish()
            }
        };
        h as i64
    }

    /// Hash the little-endian bytes of a 32-bit value.
    pub fn hash_int(&self, value: u32, seed: u32) -> i64 {
        self.hash(&value.to_le_bytes(), seed)
    }
}

impl std::fmt::Display for HashFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HashFunctions::farm => "farm",
                HashFunctions::murmur3 => "murmur3",
                HashFunctions::metro => "metro",
                HashFunctions::xx64 => "xx64",
            }
        )
    }
}

impl TryFrom<&str> for HashFunctions {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        match name.to_lowercase().as_ref() {
            "farm" => Ok(HashFunctions::farm),
            "murmur3" => Ok(HashFunctions::murmur3),
            "metro" => Ok(HashFunctions::metro),
            "xx64" => Ok(HashFunctions::xx64),
            _ => Err(Error::InvalidHashFunction {
                function: name.into(),
            }),
        }
    }
}

impl FromStr for HashFunctions {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        HashFunctions::try_from(name)
    }
}

// Lookup tables are indexed by the raw byte value. Bytes >= 128 are not
// ASCII and are classified like `N`.

pub const COMPLEMENT: [u8; 128] = {
    let mut lookup = [b'N'; 128];
    lookup[b'A' as usize] = b'T';
    lookup[b'C' as usize] = b'G';
    lookup[b'G' as usize] = b'C';
    lookup[b'T' as usize] = b'A';
    lookup[b'a' as usize] = b'T';
    lookup[b'c' as usize] = b'G';
    lookup[b'g' as usize] = b'C';
    lookup[b't' as usize] = b'A';

    // IUPAC degenerate codes
    let pairs: [(u8, u8); 10] = [
        (b'R', b'Y'),
        (b'Y', b'R'),
        (b'K', b'M'),
        (b'M', b'K'),
        (b'S', b'S'),
        (b'W', b'W'),
        (b'B', b'V'),
        (b'V', b'B'),
        (b'D', b'H'),
        (b'H', b'D'),
    ];
    let mut i = 0;
    while i < pairs.len() {
        let (from, to) = pairs[i];
        lookup[from as usize] = to;
        lookup[from.to_ascii_lowercase() as usize] = to;
        i += 1;
    }
    lookup
};

pub const TO_UPPER: [u8; 128] = {
    let mut lookup = [0; 128];
    let mut i = 0;
    while i < 128 {
        lookup[i] = (i as u8).to_ascii_uppercase();
        i += 1;
    }
    lookup
};

/// Only `N` breaks a window. IUPAC codes and other ASCII bytes are kept.
pub const AMBIGUOUS: [bool; 128] = {
    let mut lookup = [false; 128];
    lookup[b'N' as usize] = true;
    lookup[b'n' as usize] = true;
    lookup
};

pub const WHITESPACE: [bool; 128] = {
    let mut lookup = [false; 128];
    lookup[b' ' as usize] = true;
    lookup[b'\t' as usize] = true;
    lookup[b'\r' as usize] = true;
    lookup[b'\n' as usize] = true;
    lookup
};

#[inline]
pub fn is_ambiguous(nt: u8) -> bool {
    nt >= 128 || AMBIGUOUS[nt as usize]
}

#[inline]
pub fn is_whitespace(nt: u8) -> bool {
    nt < 128 && WHITESPACE[nt as usize]
}

#[inline]
pub fn to_upper(nt: u8) -> u8 {
    if nt < 128 {
        TO_UPPER[nt as usize]
    } else {
        b'N'
    }
}

#[inline]
pub fn complement(nt: u8) -> u8 {
    if nt < 128 {
        COMPLEMENT[nt as usize]
    } else {
        b'N'
    }
}

#[inline]
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|nt| complement(*nt)).collect()
}

/// The lexicographically smaller of a k-mer and its reverse complement.
/// Palindromes keep the forward orientation.
#[inline]
pub fn canonical<'a>(kmer: &'a [u8], rc: &'a [u8]) -> &'a [u8] {
    if kmer > rc {
        rc
    } else {
        kmer
    }
}
