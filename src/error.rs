use std::error::Error as StdError;

/// Custom Result type for chunkseq operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the chunkseq library, encompassing all possible error cases
/// that can occur while coding, framing, and caching sequence data.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors related to the framing of the chunk container
    #[error("Error processing frame: {0}")]
    FrameError(#[from] FrameError),

    /// Errors raised by chunk or entry codecs
    #[error("Error in codec: {0}")]
    CodecError(#[from] CodecError),

    /// Errors raised by the bit-level reader and writer
    #[error("Error in bit stream: {0}")]
    BitError(#[from] BitError),

    /// Errors that occur during write operations
    #[error("Error writing file: {0}")]
    WriteError(#[from] WriteError),

    /// Errors that occur during read operations
    #[error("Error reading file: {0}")]
    ReadError(#[from] ReadError),

    /// Errors related to the random-access genome cache
    #[error("Error with genome cache: {0}")]
    GenomeError(#[from] GenomeError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// UTF-8 conversion errors
    #[error("Error with UTF8: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// Errors from the bitnuc dependency for nucleotide encoding/decoding
    #[error("Bitnuc error: {0}")]
    BitnucError(#[from] bitnuc::NucleotideError),

    /// Errors raised while serializing records or cache files
    #[error("Serialization error: {0}")]
    EncodeError(#[from] bincode::error::EncodeError),

    /// Errors raised while deserializing records or cache files
    #[error("Deserialization error: {0}")]
    DecodeError(#[from] bincode::error::DecodeError),

    /// Errors raised while parsing FASTA input
    #[error("FASTA error: {0}")]
    FastaError(#[from] seq_io::fasta::Error),

    /// Errors raised while opening a possibly compressed input
    NifflerError(#[from] niffler::Error),

    /// Generic errors for other unexpected situations
    #[error("Generic error: {0}")]
    GenericError(#[from] Box<dyn StdError + Send + Sync>),
}
impl Error {
    /// Checks if the error reflects a corrupted or desynchronized stream
    ///
    /// Readers stop iterating after such an error since the position of the
    /// next valid entry is unknown.
    #[must_use]
    pub fn is_desync(&self) -> bool {
        match self {
            Self::CodecError(err) => err.is_desync(),
            Self::BitError(_) | Self::FrameError(_) | Self::DecodeError(_) => true,
            _ => false,
        }
    }
}

/// Errors specific to the delimited frame layout of the chunk container
#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    /// The stream ended inside a frame header
    ///
    /// # Arguments
    /// * `u64` - The byte offset of the frame
    /// * `usize` - The number of header bytes read before the stream ended
    #[error("Truncated frame header at byte {0} ({1} bytes available)")]
    TruncatedHeader(u64, usize),

    /// The frame declared more payload bytes than the stream holds
    #[error("Truncated frame payload at byte {offset}: expected {expected} bytes, found {found}")]
    TruncatedPayload {
        offset: u64,
        expected: usize,
        found: usize,
    },

    /// The payload is too large to be described by a 4-byte length
    #[error("Payload of {0} bytes exceeds the maximum frame size")]
    PayloadTooLarge(usize),
}

/// Errors raised by chunk codecs and entry codecs
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    /// A codec attempted to register the reserved delimiter byte
    #[error("Registration code {0:#04x} is reserved for the frame delimiter")]
    ReservedRegistrationCode(u8),

    /// Two codecs attempted to register the same code
    #[error("Registration code {0:#04x} is already registered")]
    DuplicateRegistrationCode(u8),

    /// A sequence byte cannot be represented by the entry codec alphabet
    #[error("Invalid base {base:#04x} at position {position}")]
    InvalidBase { base: u8, position: usize },

    /// A symbol outside the coder alphabet was encoded
    #[error("Symbol {symbol} is outside of the alphabet of {n_symbols} symbols")]
    SymbolOutOfRange { symbol: usize, n_symbols: usize },

    /// A decoded value cannot belong to any valid entry
    #[error("Entry codec model out of sync: {0}")]
    ModelDesync(&'static str),

    /// The string provided does not name a known codec
    #[error("Unknown codec name: {0}")]
    UnknownCodec(String),
}
impl CodecError {
    #[must_use]
    pub fn is_desync(&self) -> bool {
        matches!(self, Self::ModelDesync(_))
    }
}

/// Errors raised by the bit-level reader and writer
#[derive(thiserror::Error, Debug)]
pub enum BitError {
    /// A read requested bits beyond the end of the underlying buffer
    #[error("Unexpected end of bit stream at bit {position} (requested {requested} bits)")]
    UnexpectedEof { position: u64, requested: u32 },

    /// Elias-gamma coding is undefined for zero
    #[error("Elias-gamma coding requires a value >= 1")]
    GammaZero,

    /// An Elias-gamma prefix longer than 63 zeros was found
    #[error("Malformed Elias-gamma code at bit {0}")]
    MalformedGamma(u64),

    /// More than 64 bits were requested in a single fixed-width operation
    #[error("Cannot move {0} bits in a single fixed-width operation (max 64)")]
    WidthTooLarge(u32),
}

/// Errors that can occur while reading container data
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file being read is not a regular file (e.g., it might be a directory or special file)
    #[error("File is not regular")]
    IncompatibleFile,

    #[error("Invalid range specified: start ({start}) is greater than end ({end})")]
    InvalidRange { start: u64, end: u64 },

    /// Attempted to access an entry index beyond the current batch
    #[error("Requested entry index ({requested_index}) is out of batch range ({max_index})")]
    OutOfRange {
        requested_index: usize,
        max_index: usize,
    },
}

/// Errors that can occur while writing container data
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// Attempted to write after the container was closed
    #[error("Cannot write to a closed container")]
    Closed,

    /// The number of entries per chunk must be positive
    #[error("Entries per chunk must be greater than zero")]
    ZeroEntriesPerChunk,

    /// A read entry declared a pair without a primary sequence
    #[error("Read entry requires a primary sequence (sequence)")]
    MissingSequence,
}

/// Errors related to the random-access genome cache
#[derive(thiserror::Error, Debug)]
pub enum GenomeError {
    /// One of the cache files is missing
    #[error("Missing cache file: {0}")]
    MissingFile(String),

    /// The cache files disagree on the number of references
    #[error("Inconsistent cache: {0}")]
    Inconsistent(String),

    /// A trim bound could not be parsed
    #[error("Invalid trim bound '{0}' - expected 'min', 'max' or a reference index")]
    InvalidBound(String),

    /// A trim range does not cover any reference
    #[error("Invalid trim range [{min}, {max}] for {n_references} references")]
    InvalidTrim {
        min: usize,
        max: usize,
        n_references: usize,
    },

    /// A reference exceeds the 32-bit coordinate space
    #[error("Reference '{0}' is too long to cache")]
    ReferenceTooLong(String),
}

/// Trait for converting arbitrary errors into `Error`
pub trait IntoChunkseqError {
    fn into_chunkseq_error(self) -> Error;
}

// Implement conversion for Box<dyn Error>
impl<E> IntoChunkseqError for E
where
    E: StdError + Send + Sync + 'static,
{
    fn into_chunkseq_error(self) -> Error {
        Error::GenericError(Box::new(self))
    }
}
