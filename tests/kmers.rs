use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use proptest::prelude::*;

use fmhdist::kmers::{count_windows, read_records, FastaKmers, KmerDecomposer, SourceKind};
use fmhdist::Error;

fn collect_kmers(data: &[u8], k: usize, kind: SourceKind) -> Result<Vec<Vec<u8>>, Error> {
    let mut kmers = KmerDecomposer::from_bytes(data, k, true, kind)?;
    let mut out = vec![];
    while let Some(kmer) = kmers.advance()? {
        out.push(kmer.kmer.to_vec());
    }
    Ok(out)
}

#[test]
fn gzipped_input() -> Result<(), Box<dyn std::error::Error>> {
    let mut tmp = tempfile::Builder::new().suffix(".fa.gz").tempfile()?;
    {
        let mut encoder = GzEncoder::new(&mut tmp, Compression::default());
        encoder.write_all(b">h\nACTG\nNACT\nCTG\n")?;
        encoder.finish()?;
    }

    let mut kmers = FastaKmers::from_path(tmp.path(), 4, true, SourceKind::Lines)?;
    let mut out = vec![];
    while let Some(kmer) = kmers.advance()? {
        out.push(String::from_utf8(kmer.kmer.to_vec())?);
    }
    assert_eq!(out, vec!["ACTG", "ACTC", "CTCT", "TCTG"]);

    Ok(())
}

#[test]
fn empty_file_is_too_short() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::NamedTempFile::new()?;
    let result = FastaKmers::from_path(tmp.path(), 4, true, SourceKind::Bytes)
        .and_then(|mut kmers| kmers.count_remaining());
    assert!(matches!(result, Err(Error::FileTooShort)));
    Ok(())
}

#[test]
fn tiny_file_matches_memory() -> Result<(), Box<dyn std::error::Error>> {
    let mut tmp = tempfile::NamedTempFile::new()?;
    tmp.write_all(b">a\nA")?;
    tmp.flush()?;

    for kind in [SourceKind::Lines, SourceKind::Bytes] {
        let mut kmers = FastaKmers::from_path(tmp.path(), 1, true, kind)?;
        let mut out = vec![];
        while let Some(kmer) = kmers.advance()? {
            out.push(kmer.kmer.to_vec());
        }
        assert_eq!(out, vec![b"A".to_vec()]);
        assert_eq!(out, collect_kmers(b">a\nA", 1, kind)?);
    }

    Ok(())
}

#[test]
fn missing_file() {
    let result = FastaKmers::from_path("does/not/exist.fa", 4, true, SourceKind::Lines);
    assert!(matches!(result, Err(Error::IOError(_))));
}

#[test]
fn records_match_independent_parser() -> Result<(), Box<dyn std::error::Error>> {
    let data = b">r1 first\nACGTACGTTT\nGGNAC\n>r2\nTTTTACG\n>r3\nAC\n";
    let mut tmp = tempfile::Builder::new().suffix(".fa").tempfile()?;
    tmp.write_all(data)?;
    tmp.flush()?;

    let records = read_records(tmp.path())?;
    assert_eq!(records.len(), 3);

    let expected: usize = records.iter().map(|r| count_windows(r, 4, true)).sum();
    let mut kmers = FastaKmers::from_path(tmp.path(), 4, true, SourceKind::Lines)?;
    assert_eq!(kmers.count_remaining()?, expected);

    Ok(())
}

proptest! {
#[test]
fn windows_never_span_records(seq1 in "[ACGTNRY]{0,80}", seq2 in "[ACGTNKM]{0,80}", k in 1usize..12) {
    let data = format!(">a\n{}\n>b\n{}\n", seq1, seq2);
    let mut kmers = KmerDecomposer::from_bytes(data.as_bytes(), k, true, SourceKind::Lines).unwrap();
    let total = kmers.count_remaining().unwrap();

    let expected = count_windows(seq1.as_bytes(), k, true) + count_windows(seq2.as_bytes(), k, true);
    prop_assert_eq!(total, expected);
}
}

proptest! {
#[test]
fn sources_agree(seq in "[ACGTNacgtn]{0,200}", width in 1usize..30, k in 1usize..16) {
    let mut data = b">x\n".to_vec();
    for line in seq.as_bytes().chunks(width) {
        data.extend_from_slice(line);
        data.push(b'\n');
    }
    if seq.is_empty() {
        data.push(b'\n');
    }

    let lines = collect_kmers(&data, k, SourceKind::Lines).unwrap();
    let bytes = collect_kmers(&data, k, SourceKind::Bytes).unwrap();
    prop_assert_eq!(lines, bytes);
}
}

proptest! {
#[test]
fn reverse_complements_are_exact(seq in "[ACGT]{1,120}", k in 1usize..21) {
    let data = format!(">x\n{}\n", seq);
    let mut kmers = KmerDecomposer::from_bytes(data.as_bytes(), k, true, SourceKind::Bytes).unwrap();
    while let Some(kmer) = kmers.advance().unwrap() {
        let expected = fmhdist::encodings::revcomp(kmer.kmer);
        prop_assert_eq!(kmer.reverse_complement, &expected[..]);
    }
}
}
