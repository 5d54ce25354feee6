//! PKCS#9: Selected Object Classes and Attribute Types
//!
//! Attributes from [RFC 2985](https://datatracker.ietf.org/doc/html/rfc2985)
//! and the CMS additions that PKCS#7 signers and PKCS#8 keys carry.
//!
//! Decoding goes through an [`AttributeRegistry`] mapping each OID to its
//! name, cardinality, permitted value tags and codec. Attributes whose OID
//! is not registered are kept as opaque bytes and re-encode unchanged.
//!
//! # Example
//!
//! ```no_run
//! use shirushi_pkcs::pkcs9::{Attribute, AttributeSet, Value};
//!
//! let name = Attribute::by_name("FriendlyName", Value::String("My Key".into())).unwrap();
//! let set = AttributeSet::from_attributes(vec![name]).unwrap();
//! println!("{}", set);
//! ```

mod attribute;
mod attributes;
pub mod error;
mod registry;
mod value;

pub use attribute::{Attribute, AttributeValue};
pub use attributes::AttributeSet;
pub use error::{Error, Result};
pub use registry::{AttributeInfo, AttributeRegistry, DecodeFn, EncodeFn};
pub use value::{EssCertId, SigningCertificateInfo, Value, ValueKind};

pub(crate) use value::hex_dump;

pub const EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1";
pub const UNSTRUCTURED_NAME: &str = "1.2.840.113549.1.9.2";
pub const CONTENT_TYPE: &str = "1.2.840.113549.1.9.3";
pub const MESSAGE_DIGEST: &str = "1.2.840.113549.1.9.4";
pub const SIGNING_TIME: &str = "1.2.840.113549.1.9.5";
pub const COUNTERSIGNATURE: &str = "1.2.840.113549.1.9.6";
pub const CHALLENGE_PASSWORD: &str = "1.2.840.113549.1.9.7";
pub const UNSTRUCTURED_ADDRESS: &str = "1.2.840.113549.1.9.8";
pub const EXTENDED_CERTIFICATE_ATTRIBUTES: &str = "1.2.840.113549.1.9.9";
pub const ISSUER_SERIAL_NUMBER: &str = "1.2.840.113549.1.9.10";
pub const EXTENSION_REQUEST: &str = "1.2.840.113549.1.9.14";
pub const SMIME_CAPABILITY: &str = "1.2.840.113549.1.9.15";
pub const SIGNING_CERTIFICATE: &str = "1.2.840.113549.1.9.16.2.12";
pub const SIGNATURE_TIMESTAMP_TOKEN: &str = "1.2.840.113549.1.9.16.2.14";
// PKCS#12 bag attributes
pub const FRIENDLY_NAME: &str = "1.2.840.113549.1.9.20";
pub const LOCAL_KEY_ID: &str = "1.2.840.113549.1.9.21";
pub const SIGNING_CERTIFICATE_V2: &str = "1.2.840.113549.1.9.16.2.47";
pub const CMS_ALGORITHM_PROTECTION: &str = "1.2.840.113549.1.9.52";
