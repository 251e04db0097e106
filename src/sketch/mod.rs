pub mod coordinates;
pub mod fracminhash;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;

use crate::cmd::ComputeParameters;
use crate::distance::Distances;
use crate::kmers::{FastaKmers, KmerDecomposer, SymbolSource};
use crate::prelude::ToWriter;
use crate::Error;

pub use coordinates::{read_coordinates, write_coordinates, Coordinate};
pub use fracminhash::{hashed_magic_number_for, threshold_for_scaled, SketchBuilder, MAGIC};

/// A FracMinHash sketch: the sorted, deduplicated hashes below the
/// threshold implied by `scaled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sketch {
    name: Option<String>,
    ksize: u32,
    scaled: u32,
    seed: u32,
    hashed_magic_number: i64,
    values: Vec<i64>,
    coordinates: Option<Vec<Coordinate>>,
}

impl Sketch {
    /// Assemble a sketch from already retained hashes.
    pub fn new(
        name: Option<String>,
        ksize: u32,
        scaled: u32,
        seed: u32,
        hashed_magic_number: i64,
        values: Vec<i64>,
    ) -> Result<Sketch, Error> {
        if ksize == 0 {
            return Err(Error::InvalidParameter {
                name: "ksize".into(),
                message: "k-mer size must be positive".into(),
            });
        }
        if scaled == 0 {
            return Err(Error::InvalidParameter {
                name: "scaled".into(),
                message: "scaled must be positive".into(),
            });
        }
        if let Some(position) = values.windows(2).position(|w| w[0] >= w[1]) {
            return Err(Error::UnsortedHashes {
                position: position + 1,
            });
        }

        Ok(Sketch {
            name,
            ksize,
            scaled,
            seed,
            hashed_magic_number,
            values,
            coordinates: None,
        })
    }

    /// Sketch every window produced by `kmers`.
    pub fn compute<S: SymbolSource>(
        name: Option<String>,
        kmers: &mut KmerDecomposer<S>,
        params: &ComputeParameters,
    ) -> Result<Sketch, Error> {
        let mut builder = SketchBuilder::new(params)?;
        builder.consume(kmers)?;
        Ok(builder.build(name))
    }

    pub fn from_path<P: AsRef<Path>>(
        name: Option<String>,
        path: P,
        params: &ComputeParameters,
    ) -> Result<Sketch, Error> {
        params.validate()?;
        let path = path.as_ref();
        debug!("sketching {}", path.display());

        let mut kmers = FastaKmers::from_path(
            path,
            params.ksize() as usize,
            params.skip_ambiguous(),
            params.source(),
        )?;
        let sketch = Sketch::compute(name, &mut kmers, params)?;

        debug!("sketched {}: {} hashes", path.display(), sketch.size());
        Ok(sketch)
    }

    /// Sketch an in-memory FASTA text.
    pub fn from_sequence(
        name: Option<String>,
        data: &[u8],
        params: &ComputeParameters,
    ) -> Result<Sketch, Error> {
        params.validate()?;
        let mut kmers = KmerDecomposer::from_bytes(
            data,
            params.ksize() as usize,
            params.skip_ambiguous(),
            params.source(),
        )?;
        Sketch::compute(name, &mut kmers, params)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = Some(name.into());
    }

    pub fn ksize(&self) -> u32 {
        self.ksize
    }

    pub fn scaled(&self) -> u32 {
        self.scaled
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn hashed_magic_number(&self) -> i64 {
        self.hashed_magic_number
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn coordinates(&self) -> Option<&[Coordinate]> {
        self.coordinates.as_deref()
    }

    /// Attach provenance records. There must be one per value, in the same
    /// order.
    pub fn with_coordinates(mut self, coordinates: Vec<Coordinate>) -> Result<Sketch, Error> {
        if coordinates.len() != self.values.len() {
            return Err(Error::InvalidCoordinates {
                message: format!(
                    "expected {} records, found {}",
                    self.values.len(),
                    coordinates.len()
                ),
            });
        }
        if let Some((i, _)) = coordinates
            .iter()
            .zip(&self.values)
            .enumerate()
            .find(|(_, (c, v))| c.hash != **v)
        {
            return Err(Error::InvalidCoordinates {
                message: format!("record {} does not match the sketch hash", i),
            });
        }

        self.coordinates = Some(coordinates);
        Ok(self)
    }

    pub fn check_compatible(&self, other: &Sketch) -> Result<(), Error> {
        if self.ksize != other.ksize {
            return Err(Error::MismatchKSizes {
                k1: self.ksize,
                k2: other.ksize,
            });
        }
        if self.scaled != other.scaled {
            return Err(Error::MismatchScaled {
                s1: self.scaled,
                s2: other.scaled,
            });
        }
        if self.seed != other.seed {
            return Err(Error::MismatchSeed {
                seed1: self.seed,
                seed2: other.seed,
            });
        }
        if self.hashed_magic_number != other.hashed_magic_number {
            return Err(Error::MismatchHashFunction);
        }
        Ok(())
    }

    pub fn distances(&self, other: &Sketch) -> Result<Distances, Error> {
        self.check_compatible(other)?;
        Ok(Distances::between(self, other))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::with_capacity(28 + 8 * self.values.len());
        self.to_writer(&mut buf)?;
        Ok(buf)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Sketch, Error> {
        Sketch::from_reader(data)
    }

    /// Decode a sketch. `name` and coordinates are not part of the encoding.
    pub fn from_reader<R: Read>(mut rdr: R) -> Result<Sketch, Error> {
        let magic = rdr.read_u32::<LittleEndian>().map_err(truncated)?;
        if magic != MAGIC {
            return Err(Error::InvalidMagicNumber { found: magic });
        }

        let hashed_magic_number = rdr.read_i64::<LittleEndian>().map_err(truncated)?;
        let scaled = rdr.read_u32::<LittleEndian>().map_err(truncated)?;
        let ksize = rdr.read_u32::<LittleEndian>().map_err(truncated)?;
        let seed = rdr.read_u32::<LittleEndian>().map_err(truncated)?;
        let count = rdr.read_u32::<LittleEndian>().map_err(truncated)? as usize;

        // the count is untrusted, don't let it size the allocation alone
        let mut values = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            values.push(rdr.read_i64::<LittleEndian>().map_err(truncated)?);
        }

        Sketch::new(None, ksize, scaled, seed, hashed_magic_number, values)
    }

    pub fn to_hex(&self) -> Result<String, Error> {
        Ok(hex::encode(self.to_bytes()?))
    }

    pub fn from_hex(data: &str) -> Result<Sketch, Error> {
        let bytes = hex::decode(data.trim())?;
        Sketch::from_bytes(&bytes)
    }

    /// Write the hex encoding to `path`. Coordinates, when present, go to a
    /// sibling file with a `.coordinates` suffix.
    pub fn save_hex<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(self.to_hex()?.as_bytes())?;
        writer.flush()?;

        if let Some(coordinates) = &self.coordinates {
            let file = File::create(coordinates_path(path))?;
            write_coordinates(BufWriter::new(file), coordinates)?;
        }
        Ok(())
    }

    /// Read a hex encoded sketch. The name is taken from the file name.
    pub fn load_hex<P: AsRef<Path>>(path: P) -> Result<Sketch, Error> {
        let path = path.as_ref();
        let mut data = String::new();
        BufReader::new(File::open(path)?).read_to_string(&mut data)?;

        let mut sketch = Sketch::from_hex(&data)?;
        if let Some(stem) = path.file_stem() {
            sketch.set_name(stem.to_string_lossy());
        }

        let coords = coordinates_path(path);
        if coords.exists() {
            let coordinates = read_coordinates(BufReader::new(File::open(coords)?))?;
            sketch = sketch.with_coordinates(coordinates)?;
        }
        Ok(sketch)
    }
}

impl ToWriter for Sketch {
    fn to_writer<W>(&self, writer: &mut W) -> Result<(), Error>
    where
        W: io::Write,
    {
        writer.write_u32::<LittleEndian>(MAGIC)?;
        writer.write_i64::<LittleEndian>(self.hashed_magic_number)?;
        writer.write_u32::<LittleEndian>(self.scaled)?;
        writer.write_u32::<LittleEndian>(self.ksize)?;
        writer.write_u32::<LittleEndian>(self.seed)?;
        writer.write_u32::<LittleEndian>(self.values.len() as u32)?;
        for value in &self.values {
            writer.write_i64::<LittleEndian>(*value)?;
        }
        Ok(())
    }
}

fn truncated(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::TruncatedSketch
    } else {
        e.into()
    }
}

fn coordinates_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".coordinates");
    name.into()
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::encodings::HashFunctions;

    fn sketch(values: Vec<i64>) -> Sketch {
        Sketch::new(
            Some("test".into()),
            21,
            1,
            42,
            hashed_magic_number_for(HashFunctions::farm, 42),
            values,
        )
        .unwrap()
    }

    #[test]
    fn byte_layout() {
        let s = sketch(vec![-1, 2]);
        let bytes = s.to_bytes().unwrap();

        assert_eq!(bytes.len(), 28 + 16);
        assert_eq!(&bytes[0..4], &MAGIC.to_le_bytes());
        assert_eq!(&bytes[4..12], &s.hashed_magic_number().to_le_bytes());
        assert_eq!(&bytes[12..16], &1u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &21u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &42u32.to_le_bytes());
        assert_eq!(&bytes[24..28], &2u32.to_le_bytes());
        assert_eq!(&bytes[28..36], &(-1i64).to_le_bytes());
        assert_eq!(&bytes[36..44], &2i64.to_le_bytes());
    }

    #[test]
    fn decoding_drops_name() {
        let s = sketch(vec![1, 2, 3]);
        let decoded = Sketch::from_bytes(&s.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.name(), None);
        assert_eq!(decoded.values(), s.values());
        assert_eq!(decoded.hashed_magic_number(), s.hashed_magic_number());
    }

    #[test]
    fn bad_magic() {
        let mut bytes = sketch(vec![1]).to_bytes().unwrap();
        bytes[0] ^= 0xff;
        assert!(matches!(
            Sketch::from_bytes(&bytes),
            Err(Error::InvalidMagicNumber { .. })
        ));
    }

    #[test]
    fn truncated_input() {
        let bytes = sketch(vec![1, 2, 3]).to_bytes().unwrap();
        assert!(matches!(
            Sketch::from_bytes(&bytes[..bytes.len() - 3]),
            Err(Error::TruncatedSketch)
        ));
        assert!(matches!(
            Sketch::from_bytes(&bytes[..2]),
            Err(Error::TruncatedSketch)
        ));
    }

    #[test]
    fn zero_ksize_or_scaled() {
        assert!(matches!(
            Sketch::new(None, 0, 1, 42, 0, vec![1]),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            Sketch::new(None, 21, 0, 42, 0, vec![1]),
            Err(Error::InvalidParameter { .. })
        ));

        let bytes = sketch(vec![1, 2]).to_bytes().unwrap();

        let mut no_scaled = bytes.clone();
        no_scaled[12..16].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            Sketch::from_bytes(&no_scaled),
            Err(Error::InvalidParameter { .. })
        ));

        let mut no_ksize = bytes;
        no_ksize[16..20].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            Sketch::from_bytes(&no_ksize),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn unsorted_values() {
        assert!(matches!(
            Sketch::new(None, 21, 1, 42, 0, vec![1, 3, 2]),
            Err(Error::UnsortedHashes { position: 2 })
        ));
        assert!(Sketch::new(None, 21, 1, 42, 0, vec![1, 1]).is_err());
    }

    #[test]
    fn compatibility() {
        let a = sketch(vec![1]);
        let b = Sketch::new(None, 31, 1, 42, a.hashed_magic_number(), vec![]).unwrap();
        assert!(matches!(
            a.check_compatible(&b),
            Err(Error::MismatchKSizes { k1: 21, k2: 31 })
        ));

        let c = Sketch::new(None, 21, 1, 42, a.hashed_magic_number() ^ 1, vec![]).unwrap();
        assert!(matches!(
            a.check_compatible(&c),
            Err(Error::MismatchHashFunction)
        ));

        let d = Sketch::new(None, 21, 10, 42, a.hashed_magic_number(), vec![]).unwrap();
        assert!(matches!(
            a.check_compatible(&d),
            Err(Error::MismatchScaled { .. })
        ));
        assert!(a.check_compatible(&a.clone()).is_ok());
    }

    #[test]
    fn coordinates_must_match_values() {
        let s = sketch(vec![1, 2]);
        let coord = |hash| Coordinate {
            record: 0,
            file_idx: 0,
            record_idx: 0,
            file_idx_amb: 0,
            record_idx_amb: 0,
            kmer: "ACG".into(),
            hash,
        };
        assert!(s.clone().with_coordinates(vec![coord(1)]).is_err());
        assert!(s.clone().with_coordinates(vec![coord(1), coord(3)]).is_err());
        assert!(s.with_coordinates(vec![coord(1), coord(2)]).is_ok());
    }
}
