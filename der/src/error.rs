use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("parser error {0:?}")]
    Parser(nom::error::ErrorKind),
    #[error("parser incomplete: {0:?}")]
    ParserIncomplete(nom::Needed),
    #[error("unexpected end of DER input")]
    EndOfInput,
    #[error("unexpected tag: expected 0x{expected:02x}, got 0x{actual:02x}")]
    UnexpectedTag { expected: u8, actual: u8 },
    #[error("expected a constructed value, got tag 0x{0:02x}")]
    ExpectedConstructed(u8),
    #[error("expected at least {min} elements, got {actual}")]
    TooFewElements { min: usize, actual: usize },
    #[error("{0} bytes of trailing data")]
    TrailingData(usize),
    #[error("cannot retag an empty encoding")]
    EmptyEncoding,
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        match err {
            nom::Err::Incomplete(needed) => Error::ParserIncomplete(needed),
            nom::Err::Error(e) | nom::Err::Failure(e) => Error::Parser(e.code),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
