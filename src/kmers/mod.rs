//! # Streaming k-mer decomposition of FASTA inputs
//!
//! [`KmerDecomposer`] walks a FASTA stream and produces every window of
//! length `k` inside each record, together with its reverse complement and
//! its position. Windows never span two records, and (optionally) never
//! contain an ambiguous base.

pub mod source;

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use log::trace;

use crate::encodings::{complement, is_ambiguous, is_whitespace, to_upper};
use crate::Error;
use crate::Result;

pub use source::{ByteSource, InputSource, LineSource, SourceKind, SymbolSource, Token};

/// Where a window sits in the input.
///
/// `*_including_ambiguous` indices are window start offsets counting every
/// attempted position, skipped ones included. The plain indices only count
/// emitted windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub record: usize,
    pub index_in_file: usize,
    pub index_in_record: usize,
    pub index_in_file_including_ambiguous: usize,
    pub index_in_record_including_ambiguous: usize,
}

/// A view into the decomposer buffers. Valid until the next call to
/// [`KmerDecomposer::advance`]; copy the slices to keep them.
#[derive(Debug, Clone, Copy)]
pub struct Kmer<'a> {
    pub kmer: &'a [u8],
    pub reverse_complement: &'a [u8],
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Collecting the first `k - 1` symbols of a fresh window.
    Filling(usize),
    /// Window complete; every further symbol shifts it by one.
    Ready,
    Exhausted,
}

pub struct KmerDecomposer<S> {
    source: S,
    k: usize,
    skip_ambiguous: bool,
    state: State,

    // Both buffers hold every symbol twice (at `i` and `i + k`), so the
    // current window is always a contiguous slice.
    fwd: Vec<u8>,
    rc: Vec<u8>,
    head: usize,
    rc_start: usize,

    // format checks
    lines: usize,
    line_has_content: bool,
    header_line_open: bool,
    awaiting_body: Option<usize>,

    // coordinates
    record: Option<usize>,
    record_symbols: usize,
    record_emitted: usize,
    emitted_before_record: usize,
    positions_before_record: usize,
    position: Position,
}

pub type FastaKmers = KmerDecomposer<InputSource<Box<dyn Read>>>;

const SNIFF_LEN: usize = 5;

impl FastaKmers {
    /// Open a (possibly compressed) FASTA file.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        k: usize,
        skip_ambiguous: bool,
        kind: SourceKind,
    ) -> Result<FastaKmers> {
        let file = File::open(path)?;
        FastaKmers::from_reader(Box::new(file), k, skip_ambiguous, kind)
    }

    pub fn from_reader(
        mut reader: Box<dyn Read>,
        k: usize,
        skip_ambiguous: bool,
        kind: SourceKind,
    ) -> Result<FastaKmers> {
        // niffler needs SNIFF_LEN bytes to detect compression; anything
        // shorter can only be plain text.
        let mut head = Vec::with_capacity(SNIFF_LEN);
        reader
            .by_ref()
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut head)?;
        if head.len() < SNIFF_LEN {
            trace!("short input ({} bytes), reading it as plain text", head.len());
            let plain: Box<dyn Read> = Box::new(Cursor::new(head));
            return KmerDecomposer::new(InputSource::new(plain, kind), k, skip_ambiguous);
        }

        let (reader, format) = match niffler::get_reader(Box::new(Cursor::new(head).chain(reader))) {
            Ok(r) => r,
            Err(niffler::Error::FileTooShort) => return Err(Error::FileTooShort),
            Err(e) => return Err(e.into()),
        };
        trace!("opened input, compression: {:?}", format);
        KmerDecomposer::new(InputSource::new(reader, kind), k, skip_ambiguous)
    }
}

impl<'a> KmerDecomposer<InputSource<&'a [u8]>> {
    /// Decompose an in-memory, uncompressed FASTA text.
    pub fn from_bytes(
        data: &'a [u8],
        k: usize,
        skip_ambiguous: bool,
        kind: SourceKind,
    ) -> Result<Self> {
        KmerDecomposer::new(InputSource::new(data, kind), k, skip_ambiguous)
    }
}

impl<S: SymbolSource> KmerDecomposer<S> {
    pub fn new(source: S, k: usize, skip_ambiguous: bool) -> Result<KmerDecomposer<S>> {
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "k".into(),
                message: "k-mer size must be positive".into(),
            });
        }

        Ok(KmerDecomposer {
            source,
            k,
            skip_ambiguous,
            state: State::Filling(0),
            fwd: vec![0; 2 * k],
            rc: vec![0; 2 * k],
            head: 0,
            rc_start: 0,
            lines: 0,
            line_has_content: false,
            header_line_open: false,
            awaiting_body: None,
            record: None,
            record_symbols: 0,
            record_emitted: 0,
            emitted_before_record: 0,
            positions_before_record: 0,
            position: Position::default(),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Move to the next window. Returns `Ok(None)` once the input is drained.
    pub fn advance(&mut self) -> Result<Option<Kmer<'_>>> {
        loop {
            if self.state == State::Exhausted {
                return Ok(None);
            }

            match self.source.next_token()? {
                None => {
                    self.finish()?;
                    return Ok(None);
                }
                Some(Token::Header) => {
                    self.line_has_content = true;
                    if let Some(line) = self.awaiting_body {
                        self.state = State::Exhausted;
                        return Err(Error::HeaderWithoutBody { line });
                    }
                    self.awaiting_body = Some(self.lines + 1);
                    self.header_line_open = true;
                    self.start_record();
                }
                Some(Token::LineEnd) => {
                    self.lines += 1;
                    self.line_has_content = false;
                    if self.header_line_open {
                        self.header_line_open = false;
                    } else {
                        self.awaiting_body = None;
                    }
                }
                Some(Token::Symbol(b)) => {
                    self.line_has_content = true;
                    self.awaiting_body = None;
                    if is_whitespace(b) {
                        continue;
                    }
                    if self.record.is_none() {
                        self.start_record();
                    }

                    self.record_symbols += 1;
                    if self.skip_ambiguous && is_ambiguous(b) {
                        self.resync();
                        continue;
                    }

                    self.push(b);
                    if self.state == State::Ready {
                        self.update_position();
                        return Ok(Some(self.current()));
                    }
                }
            }
        }
    }

    /// Count the remaining windows, draining the input.
    pub fn count_remaining(&mut self) -> Result<usize> {
        let mut n = 0;
        while self.advance()?.is_some() {
            n += 1;
        }
        Ok(n)
    }

    fn current(&self) -> Kmer<'_> {
        Kmer {
            kmer: &self.fwd[self.head..self.head + self.k],
            reverse_complement: &self.rc[self.rc_start..self.rc_start + self.k],
            position: self.position,
        }
    }

    fn push(&mut self, b: u8) {
        let k = self.k;
        let upper = to_upper(b);
        let comp = complement(b);

        let q = self.head;
        self.fwd[q] = upper;
        self.fwd[q + k] = upper;

        let p = k - 1 - q;
        self.rc[p] = comp;
        self.rc[p + k] = comp;
        self.rc_start = p;

        self.head = if q + 1 == k { 0 } else { q + 1 };

        self.state = match self.state {
            State::Filling(n) if n + 1 == k => State::Ready,
            State::Filling(n) => State::Filling(n + 1),
            other => other,
        };
    }

    fn resync(&mut self) {
        self.head = 0;
        self.rc_start = 0;
        self.state = State::Filling(0);
    }

    fn start_record(&mut self) {
        self.record = Some(match self.record {
            Some(r) => {
                self.positions_before_record += self.record_symbols.saturating_sub(self.k - 1);
                self.emitted_before_record += self.record_emitted;
                r + 1
            }
            None => 0,
        });
        self.record_symbols = 0;
        self.record_emitted = 0;
        self.resync();
    }

    fn update_position(&mut self) {
        let start = self.record_symbols - self.k;
        self.position = Position {
            record: self.record.unwrap_or(0),
            index_in_file: self.emitted_before_record + self.record_emitted,
            index_in_record: self.record_emitted,
            index_in_file_including_ambiguous: self.positions_before_record + start,
            index_in_record_including_ambiguous: start,
        };
        self.record_emitted += 1;
    }

    fn finish(&mut self) -> Result<()> {
        self.state = State::Exhausted;
        if self.line_has_content {
            self.lines += 1;
        }
        if self.lines < 2 {
            return Err(Error::FileTooShort);
        }
        if let Some(line) = self.awaiting_body {
            return Err(Error::HeaderWithoutBody { line });
        }
        Ok(())
    }
}

/// Read the records of a FASTA/FASTQ file, one sequence per record.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<u8>>> {
    let mut parser = needletail::parse_fastx_file(path)?;
    let mut records = vec![];
    while let Some(record) = parser.next() {
        let record = record?;
        records.push(record.seq().iter().copied().filter(|b| !is_whitespace(*b)).collect());
    }
    Ok(records)
}

/// Number of windows a single record yields on its own.
pub fn count_windows(seq: &[u8], k: usize, skip_ambiguous: bool) -> usize {
    if k == 0 {
        return 0;
    }
    if !skip_ambiguous {
        return seq.len().saturating_sub(k - 1);
    }
    seq.split(|b| is_ambiguous(*b))
        .map(|run| run.len().saturating_sub(k - 1))
        .sum()
}
