//! # shirushi-pkcs
//!
//! The PKCS message layer: PKCS#7 signed messages, PKCS#8 private key
//! containers and the PKCS#9 attributes they carry, together with the
//! certificate, digest and RFC 3161 timestamp pieces those formats lean on.

pub mod digest;
pub mod error;
pub mod pkcs7;
pub mod pkcs8;
pub mod pkcs9;
pub mod tsp;
pub mod x509;

#[cfg(test)]
mod test_util;

pub use error::{Error, Result};
