//! Credential resolution
//!
//! Turns (account id, private key text, network name) into immutable
//! [`OperatorCredentials`] and a connected [`LedgerSession`]. Everything that
//! can be validated locally is validated before the connector is touched:
//! an unknown network name or an unparseable key never causes network I/O.

use hive_crypto::{
    parse_private_key, KeyParseOutcome, KeyScheme, OperatorKey, PublicKey, DEFAULT_SCHEME_ORDER,
};
use std::sync::Arc;
use std::time::Duration;

use crate::error::CredentialError;
use crate::network::NetworkProfile;
use crate::session::LedgerSession;
use crate::transport::LedgerConnector;

/// Account identity and signing key of a session
#[derive(Debug)]
pub struct OperatorCredentials {
    account_id: String,
    key: OperatorKey,
}

impl OperatorCredentials {
    pub fn new(account_id: impl Into<String>, key: OperatorKey) -> Self {
        Self {
            account_id: account_id.into(),
            key,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn scheme(&self) -> KeyScheme {
        self.key.scheme()
    }

    pub fn key(&self) -> &OperatorKey {
        &self.key
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }
}

/// Builds authenticated sessions from configuration values
pub struct CredentialResolver {
    connector: Arc<dyn LedgerConnector>,
    scheme_order: Vec<KeyScheme>,
    endpoints: Vec<String>,
    mirror_endpoints: Vec<String>,
    receipt_timing: Option<(Duration, Duration)>,
}

impl CredentialResolver {
    /// Resolver trying Ed25519 then ECDSA
    pub fn new(connector: Arc<dyn LedgerConnector>) -> Self {
        Self {
            connector,
            scheme_order: DEFAULT_SCHEME_ORDER.to_vec(),
            endpoints: Vec::new(),
            mirror_endpoints: Vec::new(),
            receipt_timing: None,
        }
    }

    /// Pin key parsing to a single scheme
    pub fn with_scheme(mut self, scheme: Option<KeyScheme>) -> Self {
        self.scheme_order = match scheme {
            Some(s) => vec![s],
            None => DEFAULT_SCHEME_ORDER.to_vec(),
        };
        self
    }

    /// Override the network's default endpoints
    pub fn with_endpoints(mut self, endpoints: Vec<String>, mirror_endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self.mirror_endpoints = mirror_endpoints;
        self
    }

    /// Override receipt timeout and poll interval
    pub fn with_receipt_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.receipt_timing = Some((timeout, poll_interval));
        self
    }

    /// Scheme attempts in order
    pub fn scheme_order(&self) -> &[KeyScheme] {
        &self.scheme_order
    }

    /// Validate inputs and parse the key without any network activity
    pub fn resolve_credentials(
        &self,
        account_id: &str,
        private_key: &str,
        network: &str,
    ) -> Result<(OperatorCredentials, NetworkProfile), CredentialError> {
        let mut profile = NetworkProfile::from_name(network)?
            .with_endpoints(self.endpoints.clone())
            .with_mirror_endpoints(self.mirror_endpoints.clone());
        if let Some((timeout, poll)) = self.receipt_timing {
            profile = profile.with_receipt_timing(timeout, poll);
        }

        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(CredentialError::Configuration(
                "operator account id is empty".to_string(),
            ));
        }
        if private_key.trim().is_empty() {
            return Err(CredentialError::Configuration(
                "operator private key is empty".to_string(),
            ));
        }

        match parse_private_key(private_key, &self.scheme_order) {
            KeyParseOutcome::Parsed(parsed) => {
                tracing::debug!(
                    account = %account_id,
                    scheme = %parsed.scheme,
                    "operator key resolved"
                );
                Ok((OperatorCredentials::new(account_id, parsed.key), profile))
            }
            KeyParseOutcome::NoneParsed { attempts } => {
                Err(CredentialError::NoSchemeMatched { attempts })
            }
        }
    }

    /// Resolve credentials and open an authenticated session
    pub async fn resolve(
        &self,
        account_id: &str,
        private_key: &str,
        network: &str,
    ) -> Result<LedgerSession, CredentialError> {
        let (credentials, profile) = self.resolve_credentials(account_id, private_key, network)?;
        let transport = self
            .connector
            .connect(&profile, credentials.account_id())
            .await
            .map_err(CredentialError::Connect)?;
        tracing::info!(
            account = %credentials.account_id(),
            network = %profile.network,
            scheme = %credentials.scheme(),
            "ledger session opened"
        );
        Ok(LedgerSession::new(credentials, profile, transport))
    }
}
