//! # shirushi
//!
//! Core traits for moving between representations in the shirushi PKCS
//! toolkit.
//!
//! The layers of the workspace are chained through these traits:
//! ```text
//! text → Pem (shirushi-pem) → PKCS structures (shirushi-pkcs)
//! Element (shirushi-asn1) → Tlv (shirushi-der)
//! ```
//!
//! A layer implements `Decoder<Source, Target>` on its source type, and the
//! target type opts in with the `DecodableFrom<Source>` marker. Encoding runs
//! the same way in reverse with `Encoder` and `EncodableTo`.
//!
//! ```ignore
//! use shirushi::decoder::Decoder;
//! use shirushi_pem::Pem;
//! use shirushi_pkcs::pkcs8::PrivateKeyContainer;
//!
//! let pem: Pem = text.decode()?;
//! let key: PrivateKeyContainer = pem.decode()?;
//! ```

#![forbid(unsafe_code)]

pub mod decoder;
pub mod encoder;
