//! The parts of X.509 a signed message needs: names, algorithm
//! identifiers, certificates with their extensions, and CRLs.
//!
//! Every structure keeps the exact bytes it was decoded from, so
//! re-encoding a certificate or CRL is lossless.

mod algorithm;
mod certificate;
mod crl;
pub mod error;
mod extension;
mod name;

pub use algorithm::AlgorithmIdentifier;
pub use certificate::{Certificate, SubjectPublicKeyInfo};
pub use crl::{Crl, RevokedCertificate};
pub use error::{Error, Result};
pub use extension::{
    EXTENDED_KEY_USAGE, ExtendedKeyUsage, Extension, Extensions, KEY_USAGE, KP_TIME_STAMPING,
    KeyUsage,
};
pub use name::{AttributeTypeAndValue, Name};
