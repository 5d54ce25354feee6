//! Encoder trait, the mirror image of [`crate::decoder::Decoder`].

/// Converts `self` (of type `T`) into its lower-layer representation `E`.
pub trait Encoder<T, E: EncodableTo<T>> {
    /// The error type returned when encoding fails.
    type Error;

    /// Encodes `self` into type `E`.
    fn encode(&self) -> Result<E, Self::Error>;
}

/// Marker trait: `Self` is the encoded form of `T`.
pub trait EncodableTo<T> {}
