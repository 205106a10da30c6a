//! Agent configuration
//!
//! Owned by the embedding process and treated as read-only by the agent
//! for its whole lifetime.

use std::time::Duration;

/// URL scheme used to reach the eIM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EimScheme {
    Http,
    #[default]
    Https,
}

impl EimScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Configuration for one eUICC/eIM pairing
#[derive(Debug, Clone)]
pub struct IpaConfig {
    /// Scheme for the eIM URL
    pub eim_scheme: EimScheme,
    /// eIM host, used verbatim in the URL
    pub eim_fqdn: String,
    /// eIM identifier expected in package results, when pinned
    pub eim_id: Option<String>,
    /// HTTP retries after the first attempt; 0 means a single attempt
    pub retry_count: u32,
    /// Connect/transfer timeout per HTTP attempt
    pub http_timeout: Duration,
    /// Logical channel to the ISD-R, 0 to use the basic channel
    pub logical_channel: u8,
    /// ISD-R AID override
    pub isdr_aid: Option<Vec<u8>>,
    /// When set, the eUICC CI list is filtered to exactly this CA key
    /// identifier and server certificates must chain to it
    pub allowed_ca_id: Option<Vec<u8>>,
    /// Device type allocation code reported during authentication
    pub tac: [u8; 4],
    /// SM-DP+ address used when a download trigger carries none
    pub default_smdp_address: Option<String>,
    /// Emulate an IoT eUICC on top of consumer ES10c primitives
    pub emulate_iot_euicc: bool,
    /// TLS peer verification; disabling is honored in debug builds only
    pub tls_verify: bool,
}

impl Default for IpaConfig {
    fn default() -> Self {
        Self {
            eim_scheme: EimScheme::Https,
            eim_fqdn: String::new(),
            eim_id: None,
            retry_count: 3,
            http_timeout: Duration::from_secs(5),
            logical_channel: 0,
            isdr_aid: None,
            allowed_ca_id: None,
            tac: [0x35, 0x29, 0x06, 0x11],
            default_smdp_address: None,
            emulate_iot_euicc: false,
            tls_verify: true,
        }
    }
}

impl IpaConfig {
    /// Configuration for the given eIM host with defaults everywhere else
    pub fn new(eim_fqdn: impl Into<String>) -> Self {
        Self {
            eim_fqdn: eim_fqdn.into(),
            ..Self::default()
        }
    }

    /// Set the URL scheme
    pub fn with_scheme(mut self, scheme: EimScheme) -> Self {
        self.eim_scheme = scheme;
        self
    }

    /// Pin the eIM identifier
    pub fn with_eim_id(mut self, eim_id: impl Into<String>) -> Self {
        self.eim_id = Some(eim_id.into());
        self
    }

    /// Set the HTTP retry budget
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the logical channel (0-3)
    pub fn with_logical_channel(mut self, channel: u8) -> Self {
        self.logical_channel = channel & 0x03;
        self
    }

    /// Restrict server certificates to one CA key identifier
    pub fn with_allowed_ca_id(mut self, ca_id: impl Into<Vec<u8>>) -> Self {
        self.allowed_ca_id = Some(ca_id.into());
        self
    }

    /// Enable IoT eUICC emulation over consumer ES10c primitives
    pub fn with_iot_emulation(mut self) -> Self {
        self.emulate_iot_euicc = true;
        self
    }

    /// Disable TLS verification (debug builds only)
    pub fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }
}
