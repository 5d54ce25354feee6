//! PKCS#7: Cryptographic Message Syntax, signed-data subset
//!
//! [`SignedMessage`] decodes SignedData in the current profile of
//! [RFC 2315](https://datatracker.ietf.org/doc/html/rfc2315) as well as the
//! legacy profile where ContentInfo carries its content without the `[0]`
//! wrapper, and the Netscape certificate sequence. It verifies signers
//! through a caller supplied [`SignatureVerifier`] and can emit a new
//! single-signer message, optionally timestamped by a TSA.
//!
//! # Example
//!
//! ```no_run
//! use shirushi_pkcs::pkcs7::SignedMessage;
//! use shirushi_pem::FromPem;
//!
//! let pem = std::fs::read_to_string("bundle.p7b").unwrap();
//! let message = SignedMessage::from_pem(&pem.parse().unwrap()).unwrap();
//! for cert in message.certificates().unwrap_or_default() {
//!     println!("{}", cert);
//! }
//! ```

use shirushi_asn1::ObjectIdentifier;

mod content_info;
pub mod error;
mod signed_data;
mod signer_info;

pub use content_info::ContentInfo;
pub use error::{Error, Result};
pub use signed_data::SignedMessage;
pub use signer_info::{SignatureVerifier, SignerInfo};

pub const DATA: &str = "1.2.840.113549.1.7.1";
pub const SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
pub const ENVELOPED_DATA: &str = "1.2.840.113549.1.7.3";
pub const SIGNED_AND_ENVELOPED_DATA: &str = "1.2.840.113549.1.7.4";
pub const DIGESTED_DATA: &str = "1.2.840.113549.1.7.5";
pub const ENCRYPTED_DATA: &str = "1.2.840.113549.1.7.6";

// Pre-standard arcs with the extra digit in the RSADSI number
pub const OLD_DATA: &str = "1.2.840.1113549.1.7.1";
pub const OLD_SIGNED_DATA: &str = "1.2.840.1113549.1.7.2";

pub const NETSCAPE_CERT_SEQUENCE: &str = "2.16.840.1.113730.2.5";
pub const TIMESTAMP_TOKEN_INFO: &str = "1.2.840.113549.1.9.16.1.4";

/// Parses one of the dotted constants of this crate.
pub(crate) fn oid(dotted: &'static str) -> ObjectIdentifier {
    match dotted.parse() {
        Ok(oid) => oid,
        Err(_) => unreachable!("{} is a well formed OID", dotted),
    }
}
