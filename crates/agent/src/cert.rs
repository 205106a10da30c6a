//! X.509 certificate extension inspection
//!
//! The agent never validates certificate chains itself (the eUICC does);
//! it only reads the Authority Key Identifier extension to enforce the
//! configured CA restriction before material is handed to the card. The
//! Authority Key Identifier is deliberately used rather than the Subject
//! Key Identifier: the restriction pins the issuing CA, not the server
//! certificate itself.

use iso7816_tlv::ber::{Tag, Tlv, Value};

use crate::error::{Error, Result};

/// id-ce-authorityKeyIdentifier (2.5.29.35)
const OID_AUTHORITY_KEY_IDENTIFIER: &[u8] = &[0x55, 0x1D, 0x23];

fn tag(value: u16) -> Result<Tag> {
    Tag::try_from(value).map_err(|e| Error::Tlv(e.to_string()))
}

fn constructed(tlv: &Tlv) -> Result<&Vec<Tlv>> {
    match tlv.value() {
        Value::Constructed(children) => Ok(children),
        Value::Primitive(_) => Err(Error::Tlv("expected constructed TLV".into())),
    }
}

fn primitive(tlv: &Tlv) -> Result<&Vec<u8>> {
    match tlv.value() {
        Value::Primitive(bytes) => Ok(bytes),
        Value::Constructed(_) => Err(Error::Tlv("expected primitive TLV".into())),
    }
}

/// Extract the Authority Key Identifier key id from a DER certificate
pub(crate) fn authority_key_identifier(cert_der: &[u8]) -> Result<Vec<u8>> {
    let cert = Tlv::from_bytes(cert_der).map_err(|e| Error::Tlv(e.to_string()))?;
    if cert.tag() != &tag(0x30)? {
        return Err(Error::Tlv("certificate is not a SEQUENCE".into()));
    }
    let tbs = constructed(&cert)?
        .first()
        .ok_or_else(|| Error::Tlv("empty certificate".into()))?;

    // Extensions live in the [3] explicit member of tbsCertificate
    let tag_extensions = tag(0xA3)?;
    let extensions_wrapper = constructed(tbs)?
        .iter()
        .find(|child| child.tag() == &tag_extensions)
        .ok_or_else(|| Error::Tlv("certificate has no extensions".into()))?;
    let extensions = constructed(extensions_wrapper)?
        .first()
        .ok_or_else(|| Error::Tlv("empty extensions wrapper".into()))?;

    for extension in constructed(extensions)? {
        let children = constructed(extension)?;
        let oid = children
            .first()
            .ok_or_else(|| Error::Tlv("empty extension".into()))?;
        if primitive(oid)?.as_slice() != OID_AUTHORITY_KEY_IDENTIFIER {
            continue;
        }
        // extnValue is the last child (a BOOLEAN may sit in between)
        let extn_value = children
            .last()
            .ok_or_else(|| Error::Tlv("extension without value".into()))?;
        let aki = Tlv::from_bytes(primitive(extn_value)?).map_err(|e| Error::Tlv(e.to_string()))?;
        let tag_key_id = tag(0x80)?;
        let key_id = constructed(&aki)?
            .iter()
            .find(|child| child.tag() == &tag_key_id)
            .ok_or_else(|| Error::Tlv("authority key identifier without key id".into()))?;
        return Ok(primitive(key_id)?.clone());
    }
    Err(Error::Tlv("no authority key identifier extension".into()))
}

/// Enforce the configured CA restriction against a server certificate
pub(crate) fn check_authority_key(cert_der: &[u8], allowed_ca_id: &[u8]) -> Result<()> {
    let aki = authority_key_identifier(cert_der)?;
    if aki != allowed_ca_id {
        return Err(Error::CaMismatch);
    }
    Ok(())
}
