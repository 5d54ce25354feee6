mod common;

use shirushi_asn1::{DerWriteExt, Integer};
use shirushi_der::{DerWriter, Tag};
use shirushi_pem::{FromPem, Label, Pem, ToPem};
use shirushi_pkcs::digest::DigestAlgorithm;
use shirushi_pkcs::pkcs7::{self, ContentInfo, SignedMessage};
use shirushi_pkcs::x509::{AlgorithmIdentifier, Certificate, Name};

use common::{DigestVerifier, ED25519, certificate, oid};

const CONTENT: &[u8] = b"legacy payload";

fn legacy_signer(serial: i64) -> Vec<u8> {
    let mut issuer_and_serial = DerWriter::new();
    issuer_and_serial
        .put_raw("CN=Legacy CA".parse::<Name>().unwrap().encoded())
        .put_small_integer(serial);
    let mut inner = DerWriter::new();
    inner
        .put_small_integer(1)
        .put_constructed(Tag::SEQUENCE, &issuer_and_serial)
        .put_raw(&DigestAlgorithm::Sha256.algorithm_identifier().to_der())
        .put(Tag::SET, &[])
        .put_raw(&AlgorithmIdentifier::new(oid(ED25519)).to_der())
        .put_octet_string(&DigestAlgorithm::Sha256.digest(CONTENT))
        .put(Tag::SET, &[]);
    let mut signer = DerWriter::new();
    signer.put_constructed(Tag::SEQUENCE, &inner);
    signer.into_bytes()
}

/// Two legacy signers; only the first one's certificate is carried.
fn legacy_message(signer_cert: &Certificate) -> Vec<u8> {
    let mut content_info = DerWriter::new();
    content_info
        .put_oid(&oid(pkcs7::OLD_DATA))
        .put_octet_string(CONTENT);

    let mut signers = DerWriter::new();
    signers.put_raw(&legacy_signer(7)).put_raw(&legacy_signer(8));

    let mut inner = DerWriter::new();
    inner
        .put_small_integer(1)
        .put(
            Tag::SET,
            &DigestAlgorithm::Sha256.algorithm_identifier().to_der(),
        )
        .put_constructed(Tag::SEQUENCE, &content_info)
        .put(Tag::SET, signer_cert.encoded())
        .put(Tag::SET, &[])
        .put_constructed(Tag::SET, &signers);
    let mut outer = DerWriter::new();
    outer.put_oid(&oid(pkcs7::OLD_SIGNED_DATA));
    outer.put_constructed(Tag::SEQUENCE, &inner);
    let mut der = DerWriter::new();
    der.put_constructed(Tag::SEQUENCE, &outer);
    der.into_bytes()
}

#[test]
fn test_legacy_two_signers() {
    let signer_cert = certificate(7, "CN=Legacy CA", "CN=Legacy Signer", &[]);
    let message = SignedMessage::from_der(&legacy_message(&signer_cert)).unwrap();

    assert!(message.is_old_style());
    assert_eq!(pkcs7::OLD_SIGNED_DATA, message.content_type().to_string());
    assert_eq!(2, message.signer_infos().len());
    assert_eq!(Some(&[signer_cert][..]), message.certificates());
    assert!(message.crls().is_none());
    assert_eq!(
        Some(CONTENT.to_vec()),
        message.content_info().data_bytes().unwrap()
    );

    // the second signer has no certificate in the message
    let verified = message.verify(None, &DigestVerifier).unwrap().unwrap();
    assert_eq!(1, verified.len());
    assert_eq!(Integer::from(7i64), *verified[0].serial_number());
}

#[test]
fn test_certs_only_bundle() {
    let root = certificate(1, "CN=Bundle Root", "CN=Bundle Root", &[]);
    let leaf = certificate(2, "CN=Bundle Root", "CN=example.com", &[]);
    let bundle = SignedMessage::new(
        Vec::new(),
        ContentInfo::detached(),
        Some(vec![leaf.clone(), root.clone()]),
        None,
        Vec::new(),
    );
    let pem = bundle.to_pem().unwrap().to_string();
    assert!(pem.starts_with("-----BEGIN PKCS7-----"));

    let decoded = SignedMessage::from_pem(&pem.parse::<Pem>().unwrap()).unwrap();
    assert!(!decoded.is_old_style());
    assert!(decoded.signer_infos().is_empty());
    assert!(decoded.digest_algorithm_ids().is_empty());
    let certificates = decoded.certificates().unwrap();
    assert_eq!(2, certificates.len());
    assert!(certificates.contains(&root));
    assert!(certificates.contains(&leaf));
    assert!(decoded.verify(None, &DigestVerifier).unwrap().is_none());
}

#[test]
fn test_cms_label_accepted() {
    let bundle = SignedMessage::new(
        Vec::new(),
        ContentInfo::detached(),
        Some(vec![certificate(1, "CN=Root", "CN=Root", &[])]),
        None,
        Vec::new(),
    );
    let pem = Pem::new(Label::Cms, bundle.encode_signed_data().unwrap());
    assert!(SignedMessage::from_pem(&pem).is_ok());

    let wrong = Pem::new(Label::Certificate, bundle.encode_signed_data().unwrap());
    assert!(matches!(
        SignedMessage::from_pem(&wrong),
        Err(pkcs7::Error::Pem(_))
    ));
}

#[test]
fn test_detached_signature_needs_content() {
    let chain = vec![certificate(7, "CN=Root", "CN=Signer", &[])];
    let der = SignedMessage::generate_signed_data(
        &DigestAlgorithm::Sha512.digest(b"detached"),
        &chain,
        None,
        &AlgorithmIdentifier::new(oid(ED25519)),
        None,
        None,
        None,
    )
    .unwrap();
    let message = SignedMessage::from_der(&der).unwrap();
    assert!(message.content_info().content().is_none());
    assert!(matches!(
        message.verify(None, &DigestVerifier),
        Err(pkcs7::Error::MissingContent)
    ));
    assert!(message
        .verify(Some(&b"detached"[..]), &DigestVerifier)
        .unwrap()
        .is_some());
    assert!(message
        .verify(Some(&b"tampered"[..]), &DigestVerifier)
        .unwrap()
        .is_none());
}

fn load_bundle(text: &str) -> shirushi_pkcs::Result<Vec<Certificate>> {
    let pem: Pem = text.parse()?;
    let message = SignedMessage::from_pem(&pem)?;
    Ok(message.certificates().unwrap_or_default().to_vec())
}

#[test]
fn test_crate_error_wraps_layers() {
    let root = certificate(1, "CN=Root", "CN=Root", &[]);
    let bundle = SignedMessage::new(
        Vec::new(),
        ContentInfo::detached(),
        Some(vec![root.clone()]),
        None,
        Vec::new(),
    );
    let text = bundle.to_pem().unwrap().to_string();
    assert_eq!(vec![root], load_bundle(&text).unwrap());

    assert!(matches!(
        load_bundle("not a pem block"),
        Err(shirushi_pkcs::Error::Pem(_))
    ));
    let certificate_pem = text.replace("PKCS7", "CERTIFICATE");
    assert!(matches!(
        load_bundle(&certificate_pem),
        Err(shirushi_pkcs::Error::Pkcs7(pkcs7::Error::Pem(_)))
    ));
}
