//! PKCS#8: Private-Key Information Syntax Specification
//!
//! This module implements [RFC 5958](https://datatracker.ietf.org/doc/html/rfc5958) (Asymmetric Key Packages)
//! which obsoletes RFC 5208 (PKCS#8 v1.2).
//!
//! [`PrivateKeyContainer`] holds the algorithm, the opaque key material and
//! the optional attributes and public key. Key material is wiped when the
//! container is dropped.

mod container;
pub mod error;

pub use container::{PrivateKeyContainer, Version};
pub use error::{Error, Result};
