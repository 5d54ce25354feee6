//! Decoder trait for type-safe conversions.
//!
//! `Decoder<T, D>` converts a source `T` into a destination `D`. The
//! destination must implement the `DecodableFrom<T>` marker, so only
//! conversions a layer explicitly declares can be called.
//!
//! ```no_run
//! use shirushi::decoder::{DecodableFrom, Decoder};
//!
//! struct Raw(Vec<u8>);
//! struct Version(u8);
//!
//! #[derive(Debug)]
//! struct Empty;
//!
//! impl DecodableFrom<Raw> for Version {}
//!
//! impl Decoder<Raw, Version> for Raw {
//!     type Error = Empty;
//!
//!     fn decode(&self) -> Result<Version, Self::Error> {
//!         self.0.first().copied().map(Version).ok_or(Empty)
//!     }
//! }
//! ```

/// Converts `self` (of type `T`) into `D`.
pub trait Decoder<T, D: DecodableFrom<T>> {
    /// The error type returned when decoding fails.
    type Error;

    /// Decodes `self` into type `D`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not a valid encoding of `D`.
    fn decode(&self) -> Result<D, Self::Error>;
}

/// Marker trait: `Self` can be decoded from `T`.
pub trait DecodableFrom<T> {}
