use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::kmers::Position;
use crate::Result;

/// Provenance of one retained hash.
///
/// Serialized as one CSV line:
/// `record,file_idx,record_idx,file_idx_amb,record_idx_amb,kmer,hash`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub record: usize,
    pub file_idx: usize,
    pub record_idx: usize,
    pub file_idx_amb: usize,
    pub record_idx_amb: usize,
    pub kmer: String,
    pub hash: i64,
}

impl Coordinate {
    pub fn new(position: &Position, kmer: &[u8], hash: i64) -> Coordinate {
        Coordinate {
            record: position.record,
            file_idx: position.index_in_file,
            record_idx: position.index_in_record,
            file_idx_amb: position.index_in_file_including_ambiguous,
            record_idx_amb: position.index_in_record_including_ambiguous,
            kmer: String::from_utf8_lossy(kmer).into_owned(),
            hash,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            record: self.record,
            index_in_file: self.file_idx,
            index_in_record: self.record_idx,
            index_in_file_including_ambiguous: self.file_idx_amb,
            index_in_record_including_ambiguous: self.record_idx_amb,
        }
    }
}

pub fn write_coordinates<W: Write>(writer: W, coordinates: &[Coordinate]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for coord in coordinates {
        wtr.serialize(coord)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_coordinates<R: Read>(reader: R) -> Result<Vec<Coordinate>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);

    let mut coordinates = vec![];
    for record in rdr.deserialize() {
        coordinates.push(record?);
    }
    Ok(coordinates)
}
