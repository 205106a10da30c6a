//! ESipa HTTP transport to the eIM
//!
//! One POST per function call against the fixed RSP endpoint, with bounded
//! retry and quadratic backoff. The response envelope is decoded here; the
//! caller picks its expected variant through the `message::esipa` helpers.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header;
use tracing::{debug, trace, warn};

use crate::asn1::esipa::{EsipaMessageFromEimToIpa, EsipaMessageFromIpaToEim};
use crate::config::IpaConfig;
use crate::error::{Error, Result};
use crate::message;

const RSP_PATH: &str = "/gsma/rsp2/asn1";
const ADMIN_PROTOCOL: &str = "gsma/rsp/v2.2.0";
const IPA_USER_AGENT: &str = "gsma-rsp-ipad";
const ASN1_CONTENT_TYPE: &str = "application/x-gsma-rsp-asn1";

/// Backoff before retry `attempt` (zero-based): (attempt+1)^2 seconds
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(u64::from((attempt + 1).pow(2)))
}

/// Seam over the eIM link so procedures can run against a scripted double
pub trait EimLink {
    /// Function call expecting a decoded response envelope
    fn call(&self, request: &EsipaMessageFromIpaToEim) -> Result<EsipaMessageFromEimToIpa>;
    /// Notification delivery; an empty response body means accepted
    fn notify(&self, request: &EsipaMessageFromIpaToEim) -> Result<()>;
}

impl EimLink for EsipaClient {
    fn call(&self, request: &EsipaMessageFromIpaToEim) -> Result<EsipaMessageFromEimToIpa> {
        EsipaClient::call(self, request)
    }

    fn notify(&self, request: &EsipaMessageFromIpaToEim) -> Result<()> {
        EsipaClient::notify(self, request)
    }
}

/// HTTP client bound to one eIM endpoint
#[derive(Debug)]
pub struct EsipaClient {
    client: Client,
    url: String,
    retry_count: u32,
}

impl EsipaClient {
    /// Build the client from the agent configuration.
    ///
    /// Disabled TLS verification is honored only in debug builds; a release
    /// build refuses to start rather than silently verifying anyway.
    pub fn new(config: &IpaConfig) -> Result<Self> {
        if !config.tls_verify && cfg!(not(debug_assertions)) {
            return Err(Error::TlsVerificationRequired);
        }

        #[allow(unused_mut)]
        let mut builder = Client::builder().timeout(config.http_timeout);
        #[cfg(debug_assertions)]
        if !config.tls_verify {
            warn!("TLS verification disabled");
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        Ok(Self {
            client: builder.build()?,
            url: format!(
                "{}://{}{}",
                config.eim_scheme.as_str(),
                config.eim_fqdn,
                RSP_PATH
            ),
            retry_count: config.retry_count,
        })
    }

    /// Endpoint this client posts to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a function request and decode the eIM's response envelope
    pub fn call(&self, request: &EsipaMessageFromIpaToEim) -> Result<EsipaMessageFromEimToIpa> {
        let body = self.post(request)?;
        if body.is_empty() {
            return Err(Error::UnexpectedEimResponse("empty eIM response body"));
        }
        message::esipa::decode_eim_to_ipa(&body)
    }

    /// Send a notification; an empty response body means accepted
    pub fn notify(&self, request: &EsipaMessageFromIpaToEim) -> Result<()> {
        let body = self.post(request)?;
        if !body.is_empty() {
            trace!(len = body.len(), "ignoring notification response body");
        }
        Ok(())
    }

    fn post(&self, request: &EsipaMessageFromIpaToEim) -> Result<Vec<u8>> {
        let body = message::esipa::encode_ipa_to_eim(request)?;
        let mut attempt = 0u32;
        loop {
            match self.attempt(&body) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < self.retry_count => {
                    let delay = backoff_delay(attempt);
                    warn!(error = %e, attempt, delay_s = delay.as_secs(), "eIM call failed, retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn attempt(&self, body: &[u8]) -> Result<Vec<u8>> {
        debug!(url = %self.url, len = body.len(), "POST to eIM");
        let response = self
            .client
            .post(&self.url)
            .header(header::ACCEPT, ASN1_CONTENT_TYPE)
            .header(header::CONTENT_TYPE, ASN1_CONTENT_TYPE)
            .header(header::USER_AGENT, IPA_USER_AGENT)
            .header("X-Admin-Protocol", ADMIN_PROTOCOL)
            .body(body.to_vec())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status.as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_scheme_fqdn_and_fixed_path() {
        let config = IpaConfig::new("eim.example.com");
        let client = EsipaClient::new(&config).unwrap();
        assert_eq!(client.url(), "https://eim.example.com/gsma/rsp2/asn1");

        let config = IpaConfig::new("eim.example.com:8443")
            .with_scheme(crate::config::EimScheme::Http);
        let client = EsipaClient::new(&config).unwrap();
        assert_eq!(client.url(), "http://eim.example.com:8443/gsma/rsp2/asn1");
    }

    #[test]
    fn backoff_grows_quadratically() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(4));
        assert_eq!(backoff_delay(2), Duration::from_secs(9));
    }
}
