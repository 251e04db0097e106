//! Input sources feeding the k-mer decomposer.
//!
//! A source turns raw FASTA bytes into a stream of [`Token`]s. Header
//! contents are consumed by the source; the decomposer only learns that a
//! header line happened.

use std::io::{self, BufRead, BufReader, Read};

use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A line starting with `>`. Its contents are skipped.
    Header,
    /// One byte of a sequence line (may be whitespace).
    Symbol(u8),
    /// End of the current line.
    LineEnd,
}

pub trait SymbolSource {
    fn next_token(&mut self) -> Result<Option<Token>>;
}

/// Which source implementation to read inputs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Lines,
    Bytes,
}

/// Reads the input one line at a time into a reusable buffer.
pub struct LineSource<R> {
    reader: R,
    line: Vec<u8>,
    pos: usize,
    pending_end: bool,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> LineSource<R> {
        LineSource {
            reader,
            line: Vec::with_capacity(256),
            pos: 0,
            pending_end: false,
        }
    }
}

impl<R: BufRead> SymbolSource for LineSource<R> {
    fn next_token(&mut self) -> Result<Option<Token>> {
        loop {
            if self.pos < self.line.len() {
                let b = self.line[self.pos];
                self.pos += 1;
                if b == b'\n' {
                    return Ok(Some(Token::LineEnd));
                }
                return Ok(Some(Token::Symbol(b)));
            }

            if self.pending_end {
                self.pending_end = false;
                return Ok(Some(Token::LineEnd));
            }

            self.line.clear();
            self.pos = 0;
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }

            if self.line[0] == b'>' {
                self.pending_end = self.line.last() == Some(&b'\n');
                self.pos = self.line.len();
                return Ok(Some(Token::Header));
            }
        }
    }
}

/// Reads the input byte by byte.
pub struct ByteSource<R> {
    bytes: io::Bytes<BufReader<R>>,
    at_line_start: bool,
    in_header: bool,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R) -> ByteSource<R> {
        ByteSource {
            bytes: BufReader::new(reader).bytes(),
            at_line_start: true,
            in_header: false,
        }
    }
}

impl<R: Read> SymbolSource for ByteSource<R> {
    fn next_token(&mut self) -> Result<Option<Token>> {
        for b in self.bytes.by_ref() {
            let b = b?;

            if b == b'\n' {
                self.in_header = false;
                self.at_line_start = true;
                return Ok(Some(Token::LineEnd));
            }

            if self.in_header {
                continue;
            }

            if self.at_line_start && b == b'>' {
                self.in_header = true;
                self.at_line_start = false;
                return Ok(Some(Token::Header));
            }

            self.at_line_start = false;
            return Ok(Some(Token::Symbol(b)));
        }
        Ok(None)
    }
}

/// Either source, picked at runtime.
pub enum InputSource<R: Read> {
    Lines(LineSource<BufReader<R>>),
    Bytes(ByteSource<R>),
}

impl<R: Read> InputSource<R> {
    pub fn new(reader: R, kind: SourceKind) -> InputSource<R> {
        match kind {
            SourceKind::Lines => InputSource::Lines(LineSource::new(BufReader::new(reader))),
            SourceKind::Bytes => InputSource::Bytes(ByteSource::new(reader)),
        }
    }
}

impl<R: Read> SymbolSource for InputSource<R> {
    fn next_token(&mut self) -> Result<Option<Token>> {
        match self {
            InputSource::Lines(s) => s.next_token(),
            InputSource::Bytes(s) => s.next_token(),
        }
    }
}
