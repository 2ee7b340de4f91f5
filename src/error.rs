//! Error taxonomy.
//!
//! | Error          | Raised by                          | Effect                               |
//! |----------------|------------------------------------|--------------------------------------|
//! | [`DecodeError`]| container decoding, field layout   | aborts loading that recording        |
//! | [`CorpusError`]| stimulus corpus build / lookup     | aborts corpus or recording load      |
//! | [`ParseError`] | participant id from file name      | skips that file, batch continues     |
//! | [`EpochError`] | epoch window construction          | aborts the epoch for that event      |
//!
//! A NaN inside an epoch window is not represented here: it indicates a
//! broken decode upstream and panics (see [`crate::epoch`]).
use thiserror::Error;

/// A container value did not have the shape the decoder expected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("expected a number, found {found}")]
    NotANumber { found: &'static str },

    #[error("expected a vector, found {found}")]
    NotAVector { found: &'static str },

    #[error("expected a 2-D matrix, found {found}")]
    NotAMatrix { found: &'static str },

    #[error("expected text, found {found}")]
    NotText { found: &'static str },

    #[error("empty container where a value was expected")]
    Empty,

    #[error("ragged nested array: row {row} has {got} elements, expected {expected}")]
    Ragged { row: usize, got: usize, expected: usize },

    #[error("struct record has no field at index {index} ({name})")]
    MissingField { index: usize, name: &'static str },

    #[error("variable '{0}' not present in container")]
    MissingVariable(String),

    #[error("field '{field}': {reason}")]
    Field { field: &'static str, reason: String },
}

/// Stimulus corpus could not be built, or a lookup fell outside it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CorpusError {
    #[error("sentence number {0} is outside the corpus")]
    SentenceOutOfRange(i64),

    #[error("word number {word} is outside sentence {sentence}")]
    WordOutOfRange { sentence: u32, word: i64 },

    #[error("flag table has no entry for sentence {sentence}, word {word}, participant index {participant}")]
    FlagOutOfRange { sentence: u32, word: u32, participant: usize },

    #[error("malformed corpus: {0}")]
    Malformed(#[from] DecodeError),
}

/// Participant id could not be extracted from a recording file name.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("file name '{name}' does not start with '{prefix}'")]
    MissingPrefix { name: String, prefix: String },

    #[error("file name '{name}' has non-numeric participant id '{id}'")]
    NotNumeric { name: String, id: String },

    #[error("participant id 0 in '{0}' (ids are 1-based)")]
    ZeroId(String),
}

/// An epoch window cannot be cut for an event.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EpochError {
    #[error("sample rate {0} Hz gives an empty baseline window")]
    DegenerateSampleRate(f64),

    #[error("epoch window [{start}, {end}) lies outside the recording (0..{n_samples})")]
    OutOfBounds { start: i64, end: i64, n_samples: usize },
}
