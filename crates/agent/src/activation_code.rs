//! Activation code parsing
//!
//! An activation code is a `$`-delimited ASCII string, optionally prefixed
//! with `LPA:` and a format-version field, carrying the SM-DP+ address and
//! matching token needed to start a profile download, plus up to four
//! optional trailing fields.

/// Error type for activation code parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationCodeError {
    /// Input is empty or whitespace only
    #[error("empty activation code")]
    Empty,

    /// Input contains non-ASCII bytes
    #[error("activation code is not ASCII")]
    NotAscii,

    /// Unsupported activation code format version
    #[error("unsupported activation code format: {0}")]
    UnsupportedFormat(String),

    /// A mandatory field is absent or empty
    #[error("missing mandatory field: {0}")]
    MissingField(&'static str),
}

/// Parsed activation code fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationCode {
    /// SM-DP+ server address (FQDN)
    pub smdp_address: String,
    /// Matching token presented to the SM-DP+
    pub token: String,
    /// SM-DP+ OID, when pinned by the code
    pub smdp_oid: Option<String>,
    /// Whether the end user must supply a confirmation code
    pub confirmation_code_required: bool,
    /// CI public key indicator restricting the certificate chain
    pub ci_public_key_indicator: Option<String>,
    /// Whether the code was issued for a device change
    pub device_change: bool,
}

impl ActivationCode {
    /// Parse a `$`-delimited activation code string.
    ///
    /// The `LPA:` scheme prefix and the leading `1` format field are both
    /// optional; an explicit format field other than `1` is rejected. The
    /// SM-DP+ address and token are mandatory, everything after them is
    /// optional and positional.
    pub fn parse(input: &str) -> Result<Self, ActivationCodeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ActivationCodeError::Empty);
        }
        if !trimmed.is_ascii() {
            return Err(ActivationCodeError::NotAscii);
        }
        let body = trimmed.strip_prefix("LPA:").unwrap_or(trimmed);

        let mut fields = body.split('$').peekable();
        // Leading format-version field, when present
        if fields.peek() == Some(&"1") {
            fields.next();
        } else if let Some(first) = fields.peek() {
            if first.len() <= 2 && first.chars().all(|c| c.is_ascii_digit()) {
                return Err(ActivationCodeError::UnsupportedFormat((*first).into()));
            }
        }

        let smdp_address = fields
            .next()
            .filter(|f| !f.is_empty())
            .ok_or(ActivationCodeError::MissingField("smdp address"))?
            .to_owned();
        let token = fields
            .next()
            .filter(|f| !f.is_empty())
            .ok_or(ActivationCodeError::MissingField("token"))?
            .to_owned();

        let non_empty = |f: Option<&str>| f.filter(|f| !f.is_empty()).map(str::to_owned);
        let smdp_oid = non_empty(fields.next());
        let confirmation_code_required = fields.next() == Some("1");
        let ci_public_key_indicator = non_empty(fields.next());
        let device_change = fields.next() == Some("1");

        Ok(Self {
            smdp_address,
            token,
            smdp_oid,
            confirmation_code_required,
            ci_public_key_indicator,
            device_change,
        })
    }

    /// Render back to the canonical `1$...` string form.
    ///
    /// Trailing optional fields that are unset are omitted; interior gaps
    /// are kept as empty fields so positions stay stable.
    pub fn dump(&self) -> String {
        let mut fields: Vec<String> = vec![
            "1".to_owned(),
            self.smdp_address.clone(),
            self.token.clone(),
            self.smdp_oid.clone().unwrap_or_default(),
            if self.confirmation_code_required {
                "1".to_owned()
            } else {
                String::new()
            },
            self.ci_public_key_indicator.clone().unwrap_or_default(),
            if self.device_change {
                "1".to_owned()
            } else {
                String::new()
            },
        ];
        while fields.len() > 3 && fields.last().is_some_and(String::is_empty) {
            fields.pop();
        }
        fields.join("$")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_form_with_scheme_prefix() {
        let ac =
            ActivationCode::parse("LPA:1$smdp.example.com$04386-AGYFT-A74Y8-3F815$1.3.6.1.4.1$1")
                .unwrap();
        assert_eq!(ac.smdp_address, "smdp.example.com");
        assert_eq!(ac.token, "04386-AGYFT-A74Y8-3F815");
        assert_eq!(ac.smdp_oid.as_deref(), Some("1.3.6.1.4.1"));
        assert!(ac.confirmation_code_required);
        assert!(!ac.device_change);
    }

    #[test]
    fn two_field_form_is_valid() {
        let ac = ActivationCode::parse("smdp.example.com$TOKEN").unwrap();
        assert_eq!(ac.smdp_address, "smdp.example.com");
        assert_eq!(ac.token, "TOKEN");
        assert_eq!(ac.smdp_oid, None);
        assert!(!ac.confirmation_code_required);
    }

    #[test]
    fn missing_mandatory_fields_invalidate_the_parse() {
        assert!(ActivationCode::parse("").is_err());
        assert!(ActivationCode::parse("1$smdp.example.com").is_err());
        assert!(ActivationCode::parse("1$$TOKEN").is_err());
        assert!(ActivationCode::parse("1$smdp.example.com$").is_err());
        assert!(ActivationCode::parse("2$smdp.example.com$TOKEN").is_err());
    }

    #[test]
    fn reparse_of_dump_preserves_fields() {
        for input in [
            "1$smdp.example.com$TOKEN",
            "1$smdp.example.com$TOKEN$OID",
            "1$smdp.example.com$TOKEN$$1",
            "LPA:1$smdp.example.com$TOKEN$OID$1$ci-01$1",
        ] {
            let first = ActivationCode::parse(input).unwrap();
            let second = ActivationCode::parse(&first.dump()).unwrap();
            assert_eq!(first, second);
        }
    }
}
