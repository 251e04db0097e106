use thiserror::Error;

#[derive(Debug, Error)]
pub enum FmhError {
    /// Raised for internal errors in the libraries.  Should not happen.
    #[error("internal error: {message:?}")]
    Internal { message: String },

    #[error("a worker panicked: {message}")]
    Panic { message: String },

    #[error("different ksizes cannot be compared: {k1} != {k2}")]
    MismatchKSizes { k1: u32, k2: u32 },

    #[error("mismatch in scaled; comparison fail: {s1} != {s2}")]
    MismatchScaled { s1: u32, s2: u32 },

    #[error("mismatch in seed; comparison fail: {seed1} != {seed2}")]
    MismatchSeed { seed1: u32, seed2: u32 },

    #[error("sketches were built with different hash functions")]
    MismatchHashFunction,

    #[error("Invalid hash function: {function:?}")]
    InvalidHashFunction { function: String },

    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },

    #[error("incorrect magic number: {found:#x}")]
    InvalidMagicNumber { found: u32 },

    #[error("file is too short, valid FASTA files have at least two lines")]
    FileTooShort,

    #[error("fasta file contains header without body (line {line})")]
    HeaderWithoutBody { line: usize },

    #[error("sketch data ends early")]
    TruncatedSketch,

    #[error("hash values are not strictly increasing at position {position}")]
    UnsortedHashes { position: usize },

    #[error("invalid coordinates record: {message}")]
    InvalidCoordinates { message: String },

    #[error(transparent)]
    HexError(#[from] hex::FromHexError),

    #[error(transparent)]
    CsvError(#[from] csv::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::error::Error),

    #[error(transparent)]
    NifflerError(#[from] niffler::Error),

    #[error(transparent)]
    ParseError(#[from] needletail::errors::ParseError),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl FmhError {
    /// I/O hiccups worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, FmhError::IOError(_) | FmhError::NifflerError(_))
    }

    /// Errors that doom a single input but say nothing about the others.
    pub fn is_item_local(&self) -> bool {
        matches!(
            self,
            FmhError::FileTooShort
                | FmhError::HeaderWithoutBody { .. }
                | FmhError::InvalidMagicNumber { .. }
                | FmhError::UnsortedHashes { .. }
                | FmhError::TruncatedSketch
                | FmhError::HexError(_)
                | FmhError::ParseError(_)
        )
    }

    pub fn is_compatibility(&self) -> bool {
        matches!(
            self,
            FmhError::MismatchKSizes { .. }
                | FmhError::MismatchScaled { .. }
                | FmhError::MismatchSeed { .. }
                | FmhError::MismatchHashFunction
        )
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmhErrorCode {
    // no error
    NoError = 0,
    // panics and internals
    Panic = 1,
    Internal = 2,
    // Compatibility errors
    MismatchKSizes = 1_01,
    MismatchScaled = 1_02,
    MismatchSeed = 1_03,
    MismatchHashFunction = 1_04,
    // Configuration errors
    InvalidHashFunction = 2_01,
    InvalidParameter = 2_02,
    // Format errors
    InvalidMagicNumber = 11_01,
    FileTooShort = 11_02,
    HeaderWithoutBody = 11_03,
    UnsortedHashes = 11_04,
    InvalidCoordinates = 11_05,
    TruncatedSketch = 11_06,
    // external errors
    Io = 100_001,
    HexError = 100_002,
    CsvError = 100_003,
    SerdeError = 100_004,
    NifflerError = 100_005,
    ParseError = 100_006,
}

impl FmhErrorCode {
    pub fn from_error(error: &FmhError) -> FmhErrorCode {
        match error {
            FmhError::Internal { .. } => FmhErrorCode::Internal,
            FmhError::Panic { .. } => FmhErrorCode::Panic,
            FmhError::MismatchKSizes { .. } => FmhErrorCode::MismatchKSizes,
            FmhError::MismatchScaled { .. } => FmhErrorCode::MismatchScaled,
            FmhError::MismatchSeed { .. } => FmhErrorCode::MismatchSeed,
            FmhError::MismatchHashFunction => FmhErrorCode::MismatchHashFunction,
            FmhError::InvalidHashFunction { .. } => FmhErrorCode::InvalidHashFunction,
            FmhError::InvalidParameter { .. } => FmhErrorCode::InvalidParameter,
            FmhError::InvalidMagicNumber { .. } => FmhErrorCode::InvalidMagicNumber,
            FmhError::FileTooShort => FmhErrorCode::FileTooShort,
            FmhError::HeaderWithoutBody { .. } => FmhErrorCode::HeaderWithoutBody,
            FmhError::UnsortedHashes { .. } => FmhErrorCode::UnsortedHashes,
            FmhError::InvalidCoordinates { .. } => FmhErrorCode::InvalidCoordinates,
            FmhError::TruncatedSketch => FmhErrorCode::TruncatedSketch,
            FmhError::HexError { .. } => FmhErrorCode::HexError,
            FmhError::CsvError { .. } => FmhErrorCode::CsvError,
            FmhError::SerdeError { .. } => FmhErrorCode::SerdeError,
            FmhError::NifflerError { .. } => FmhErrorCode::NifflerError,
            FmhError::ParseError { .. } => FmhErrorCode::ParseError,
            FmhError::IOError { .. } => FmhErrorCode::Io,
        }
    }
}
