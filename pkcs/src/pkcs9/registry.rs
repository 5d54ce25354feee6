//! The table mapping attribute OIDs to names, cardinality, permitted value
//! tags and value codecs.
//!
//! The process-wide table is built once on first use and read-only after
//! that. Callers needing extra attributes build their own registry from
//! [`AttributeRegistry::builtin`] and decode with
//! [`Attribute::decode_with`](super::Attribute::decode_with).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;

use shirushi_asn1::ObjectIdentifier;
use shirushi_der::Tag;

use super::error::Result;
use super::value::{self, Value, ValueKind};
use super::*;

/// Decodes one value from its complete encoding.
pub type DecodeFn = fn(&[u8]) -> Result<Value>;
/// Encodes one value to a complete DER element.
pub type EncodeFn = fn(&Value) -> Result<Vec<u8>>;

#[derive(Debug, Clone, Copy)]
struct Codec {
    kind: ValueKind,
    decode: DecodeFn,
    encode: EncodeFn,
}

/// Everything the registry knows about one attribute type.
#[derive(Debug, Clone, Copy)]
pub struct AttributeInfo {
    oid: &'static str,
    name: &'static str,
    single_valued: bool,
    permitted_tags: &'static [Tag],
    codec: Option<Codec>,
}

impl AttributeInfo {
    pub const fn new(
        oid: &'static str,
        name: &'static str,
        single_valued: bool,
        permitted_tags: &'static [Tag],
        kind: ValueKind,
        decode: DecodeFn,
        encode: EncodeFn,
    ) -> Self {
        Self {
            oid,
            name,
            single_valued,
            permitted_tags,
            codec: Some(Codec {
                kind,
                decode,
                encode,
            }),
        }
    }

    /// A known attribute whose values are not decoded.
    pub const fn unsupported(
        oid: &'static str,
        name: &'static str,
        single_valued: bool,
        permitted_tags: &'static [Tag],
    ) -> Self {
        Self {
            oid,
            name,
            single_valued,
            permitted_tags,
            codec: None,
        }
    }

    pub fn oid(&self) -> &'static str {
        self.oid
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_single_valued(&self) -> bool {
        self.single_valued
    }

    pub fn permitted_tags(&self) -> &'static [Tag] {
        self.permitted_tags
    }

    pub fn permits(&self, tag: Tag) -> bool {
        self.permitted_tags.contains(&tag)
    }

    pub fn is_supported(&self) -> bool {
        self.codec.is_some()
    }

    /// Kind of value the codec produces, `None` when unsupported.
    pub fn value_kind(&self) -> Option<ValueKind> {
        self.codec.map(|c| c.kind)
    }

    pub fn decoder(&self) -> Option<DecodeFn> {
        self.codec.map(|c| c.decode)
    }

    pub fn encoder(&self) -> Option<EncodeFn> {
        self.codec.map(|c| c.encode)
    }

    pub(crate) fn expected_tags(&self) -> String {
        let tags = self
            .permitted_tags
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{}]", tags)
    }
}

impl fmt::Display for AttributeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.oid)
    }
}

const STRING_TAGS: &[Tag] = &[
    Tag::IA5_STRING,
    Tag::PRINTABLE_STRING,
    Tag::UTF8_STRING,
    Tag::BMP_STRING,
    Tag::T61_STRING,
];
const PASSWORD_TAGS: &[Tag] = &[
    Tag::PRINTABLE_STRING,
    Tag::T61_STRING,
    Tag::BMP_STRING,
    Tag::UNIVERSAL_STRING,
    Tag::UTF8_STRING,
];
const ADDRESS_TAGS: &[Tag] = &[Tag::PRINTABLE_STRING, Tag::T61_STRING, Tag::UTF8_STRING];
const TIME_TAGS: &[Tag] = &[Tag::UTC_TIME, Tag::GENERALIZED_TIME];

const BUILTIN: &[AttributeInfo] = &[
    AttributeInfo::new(
        EMAIL_ADDRESS,
        "EmailAddress",
        false,
        &[Tag::IA5_STRING],
        ValueKind::String,
        value::decode_string,
        value::encode_ia5_string,
    ),
    AttributeInfo::new(
        UNSTRUCTURED_NAME,
        "UnstructuredName",
        false,
        STRING_TAGS,
        ValueKind::String,
        value::decode_string,
        value::encode_ia5_string,
    ),
    AttributeInfo::new(
        CONTENT_TYPE,
        "ContentType",
        true,
        &[Tag::OBJECT_IDENTIFIER],
        ValueKind::Oid,
        value::decode_oid,
        value::encode_oid,
    ),
    AttributeInfo::new(
        MESSAGE_DIGEST,
        "MessageDigest",
        true,
        &[Tag::OCTET_STRING],
        ValueKind::Bytes,
        value::decode_octets,
        value::encode_octets,
    ),
    AttributeInfo::new(
        SIGNING_TIME,
        "SigningTime",
        true,
        TIME_TAGS,
        ValueKind::Time,
        value::decode_time,
        value::encode_time,
    ),
    AttributeInfo::new(
        COUNTERSIGNATURE,
        "Countersignature",
        false,
        &[Tag::SEQUENCE],
        ValueKind::SignerInfo,
        value::decode_signer_info,
        value::encode_signer_info,
    ),
    AttributeInfo::new(
        CHALLENGE_PASSWORD,
        "ChallengePassword",
        true,
        PASSWORD_TAGS,
        ValueKind::String,
        value::decode_string,
        value::encode_printable_string,
    ),
    AttributeInfo::new(
        UNSTRUCTURED_ADDRESS,
        "UnstructuredAddress",
        false,
        ADDRESS_TAGS,
        ValueKind::String,
        value::decode_string,
        value::encode_printable_string,
    ),
    AttributeInfo::unsupported(
        EXTENDED_CERTIFICATE_ATTRIBUTES,
        "ExtendedCertificateAttributes",
        false,
        &[Tag::SET],
    ),
    AttributeInfo::unsupported(
        ISSUER_SERIAL_NUMBER,
        "IssuerAndSerialNumber",
        true,
        &[Tag::SEQUENCE],
    ),
    AttributeInfo::new(
        EXTENSION_REQUEST,
        "ExtensionRequest",
        true,
        &[Tag::SEQUENCE],
        ValueKind::Extensions,
        value::decode_extensions,
        value::encode_extensions,
    ),
    AttributeInfo::new(
        SMIME_CAPABILITY,
        "SMIMECapability",
        true,
        &[Tag::SEQUENCE],
        ValueKind::Der,
        value::decode_der,
        value::encode_der,
    ),
    AttributeInfo::new(
        SIGNING_CERTIFICATE,
        "SigningCertificate",
        true,
        &[Tag::SEQUENCE],
        ValueKind::SigningCertificate,
        value::decode_signing_certificate,
        value::encode_signing_certificate,
    ),
    AttributeInfo::new(
        SIGNATURE_TIMESTAMP_TOKEN,
        "SignatureTimestampToken",
        true,
        &[Tag::SEQUENCE],
        ValueKind::Der,
        value::decode_der,
        value::encode_der,
    ),
    AttributeInfo::new(
        FRIENDLY_NAME,
        "FriendlyName",
        true,
        &[Tag::BMP_STRING],
        ValueKind::String,
        value::decode_string,
        value::encode_bmp_string,
    ),
    AttributeInfo::new(
        LOCAL_KEY_ID,
        "LocalKeyId",
        true,
        &[Tag::OCTET_STRING],
        ValueKind::Bytes,
        value::decode_octets,
        value::encode_octets,
    ),
    AttributeInfo::new(
        SIGNING_CERTIFICATE_V2,
        "SigningCertificateV2",
        true,
        &[Tag::SEQUENCE],
        ValueKind::SigningCertificate,
        value::decode_signing_certificate,
        value::encode_signing_certificate,
    ),
    AttributeInfo::new(
        CMS_ALGORITHM_PROTECTION,
        "CMSAlgorithmProtection",
        true,
        &[Tag::SEQUENCE],
        ValueKind::Der,
        value::decode_der,
        value::encode_der,
    ),
];

static GLOBAL: LazyLock<AttributeRegistry> = LazyLock::new(AttributeRegistry::builtin);

/// OID-keyed attribute table.
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    entries: BTreeMap<ObjectIdentifier, AttributeInfo>,
    names: HashMap<String, ObjectIdentifier>,
}

impl AttributeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the RFC 2985 and CMS attributes.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for info in BUILTIN {
            registry.register(*info);
        }
        registry
    }

    /// The shared built-in registry.
    pub fn global() -> &'static AttributeRegistry {
        &GLOBAL
    }

    /// Adds `info`.
    ///
    /// # Panics
    ///
    /// If the OID is malformed or either the OID or the name is already
    /// registered. Tables are assembled once at startup, so this is a
    /// programming error rather than an input error.
    pub fn register(&mut self, info: AttributeInfo) -> &mut Self {
        let oid: ObjectIdentifier = match info.oid.parse() {
            Ok(oid) => oid,
            Err(e) => panic!("attribute {} has a malformed OID {}: {}", info.name, info.oid, e),
        };
        if self.entries.contains_key(&oid) {
            panic!("attribute OID {} is already registered", oid);
        }
        let key = info.name.to_ascii_lowercase();
        if self.names.contains_key(&key) {
            panic!("attribute name {} is already registered", info.name);
        }
        self.names.insert(key, oid.clone());
        self.entries.insert(oid, info);
        self
    }

    pub fn lookup(&self, oid: &ObjectIdentifier) -> Option<&AttributeInfo> {
        self.entries.get(oid)
    }

    /// Case-insensitive lookup by attribute name.
    pub fn lookup_name(&self, name: &str) -> Option<&AttributeInfo> {
        self.oid_of(name).and_then(|oid| self.entries.get(oid))
    }

    pub fn oid_of(&self, name: &str) -> Option<&ObjectIdentifier> {
        self.names.get(&name.to_ascii_lowercase())
    }

    pub fn name_of(&self, oid: &ObjectIdentifier) -> Option<&'static str> {
        self.lookup(oid).map(AttributeInfo::name)
    }

    pub fn contains(&self, oid: &ObjectIdentifier) -> bool {
        self.entries.contains_key(oid)
    }

    /// Entries in ascending OID order.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectIdentifier, &AttributeInfo)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(oid, name, single_valued, supported,
        case(EMAIL_ADDRESS, "EmailAddress", false, true),
        case(CONTENT_TYPE, "ContentType", true, true),
        case(COUNTERSIGNATURE, "Countersignature", false, true),
        case(EXTENDED_CERTIFICATE_ATTRIBUTES, "ExtendedCertificateAttributes", false, false),
        case(ISSUER_SERIAL_NUMBER, "IssuerAndSerialNumber", true, false),
        case(SIGNATURE_TIMESTAMP_TOKEN, "SignatureTimestampToken", true, true),
        case(CMS_ALGORITHM_PROTECTION, "CMSAlgorithmProtection", true, true),
    )]
    fn test_builtin_entries(oid: &str, name: &str, single_valued: bool, supported: bool) {
        let registry = AttributeRegistry::global();
        let oid: ObjectIdentifier = oid.parse().unwrap();
        let info = registry.lookup(&oid).unwrap();
        assert_eq!(name, info.name());
        assert_eq!(single_valued, info.is_single_valued());
        assert_eq!(supported, info.is_supported());
        assert_eq!(Some(name), registry.name_of(&oid));
        assert_eq!(Some(&oid), registry.oid_of(name));
    }

    #[test]
    fn test_lookup_name_is_case_insensitive() {
        let registry = AttributeRegistry::global();
        let info = registry.lookup_name("messagedigest").unwrap();
        assert_eq!(MESSAGE_DIGEST, info.oid());
        assert!(registry.lookup_name("NoSuchAttribute").is_none());
    }

    #[test]
    fn test_builtin_size_and_order() {
        let registry = AttributeRegistry::builtin();
        assert_eq!(BUILTIN.len(), registry.len());
        let oids: Vec<_> = registry.iter().map(|(oid, _)| oid.clone()).collect();
        let mut sorted = oids.clone();
        sorted.sort();
        assert_eq!(sorted, oids);
    }

    #[test]
    fn test_permitted_tags() {
        let registry = AttributeRegistry::global();
        let info = registry.lookup(&SIGNING_TIME.parse().unwrap()).unwrap();
        assert!(info.permits(Tag::UTC_TIME));
        assert!(info.permits(Tag::GENERALIZED_TIME));
        assert!(!info.permits(Tag::OCTET_STRING));
        assert_eq!("[0x17, 0x18]", info.expected_tags());
    }

    #[test]
    fn test_register_custom() {
        let mut registry = AttributeRegistry::new();
        registry.register(AttributeInfo::unsupported(
            "1.3.6.1.4.1.311.2.1.12",
            "SpcSpOpusInfo",
            true,
            &[Tag::SEQUENCE],
        ));
        assert_eq!(1, registry.len());
        assert!(registry.lookup_name("spcspopusinfo").is_some());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_register_duplicate_oid_panics() {
        let mut registry = AttributeRegistry::builtin();
        registry.register(AttributeInfo::unsupported(
            CONTENT_TYPE,
            "AnotherContentType",
            true,
            &[Tag::OBJECT_IDENTIFIER],
        ));
    }
}
