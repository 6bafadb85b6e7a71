//! Exchange credential payloads and their validation rules.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Supported exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    /// Primary exchange; the leader account always lives here.
    Binance,
    /// Requires an API passphrase in addition to key and secret.
    Bitget,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
            Exchange::Bitget => "bitget",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "binance" => Some(Exchange::Binance),
            "bitget" => Some(Exchange::Bitget),
            _ => None,
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Live,
    Test,
}

impl Env {
    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Live => "live",
            Env::Test => "test",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "live" => Some(Env::Live),
            "test" => Some(Env::Test),
            _ => None,
        }
    }
}

impl std::fmt::Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leader account credentials. The exchange is always the primary one.
///
/// The secret is write-only: callers clear it as soon as a save is
/// confirmed, and it is never echoed back by any view.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderConfig {
    pub exchange: Exchange,
    pub env: Env,
    pub api_key: String,
    pub api_secret: String,
}

impl LeaderConfig {
    pub fn new(env: Env, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            exchange: Exchange::Binance,
            env,
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Trim whitespace on every string field.
    pub fn trimmed(&self) -> Self {
        Self {
            exchange: self.exchange,
            env: self.env,
            api_key: self.api_key.trim().to_string(),
            api_secret: self.api_secret.trim().to_string(),
        }
    }

    /// Key and secret must be non-blank.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.api_key.trim().is_empty() {
            return Err(ClientError::Validation("api_key must not be empty".into()));
        }
        if self.api_secret.trim().is_empty() {
            return Err(ClientError::Validation("api_secret must not be empty".into()));
        }
        Ok(())
    }
}

/// Typed follower credentials, tagged by exchange.
///
/// The passphrase only exists on the variant that needs it, so a payload
/// missing one cannot be constructed. Serializes with `exchange` as the
/// tag, matching the wire shape the backend expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "exchange", rename_all = "lowercase")]
pub enum FollowerCredential {
    Binance {
        env: Env,
        api_key: String,
        api_secret: String,
    },
    Bitget {
        env: Env,
        api_key: String,
        api_secret: String,
        passphrase: String,
    },
}

impl FollowerCredential {
    pub fn exchange(&self) -> Exchange {
        match self {
            FollowerCredential::Binance { .. } => Exchange::Binance,
            FollowerCredential::Bitget { .. } => Exchange::Bitget,
        }
    }
}

/// Create-account request body: a name plus the credentials.
#[derive(Debug, Clone, Serialize)]
pub struct NewFollowerAccount {
    pub name: String,
    #[serde(flatten)]
    pub credential: FollowerCredential,
}

/// Raw credential input as gathered from the user, before any typing.
///
/// All fields are plain strings so the validator can be total over
/// whatever was entered; [`CredentialForm::to_credential`] produces the
/// typed payload once the form passes.
#[derive(Debug, Clone, Default)]
pub struct CredentialForm {
    pub name: String,
    pub exchange: String,
    pub env: String,
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl CredentialForm {
    /// Trim whitespace on every field. Applied before validation and
    /// before any payload is built for transmission.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            exchange: self.exchange.trim().to_string(),
            env: self.env.trim().to_string(),
            api_key: self.api_key.trim().to_string(),
            api_secret: self.api_secret.trim().to_string(),
            passphrase: self.passphrase.trim().to_string(),
        }
    }

    /// Check required fields. Pure, no I/O.
    ///
    /// Passphrase is required only when the exchange demands one; its
    /// content is ignored for every other exchange.
    pub fn validate(&self, require_name: bool) -> bool {
        let form = self.trimmed();
        if require_name && form.name.is_empty() {
            return false;
        }
        if form.exchange.is_empty()
            || form.env.is_empty()
            || form.api_key.is_empty()
            || form.api_secret.is_empty()
        {
            return false;
        }
        if form.exchange == Exchange::Bitget.as_str() && form.passphrase.is_empty() {
            return false;
        }
        true
    }

    /// Build the typed credential payload, or report which field is bad.
    pub fn to_credential(&self) -> Result<FollowerCredential, ClientError> {
        let form = self.trimmed();
        if !form.validate(false) {
            return Err(ClientError::Validation(
                "exchange, env, api_key and api_secret are required (and passphrase for bitget)"
                    .into(),
            ));
        }
        let exchange = Exchange::parse(&form.exchange)
            .ok_or_else(|| ClientError::Validation(format!("unknown exchange: {}", form.exchange)))?;
        let env = Env::parse(&form.env)
            .ok_or_else(|| ClientError::Validation(format!("unknown env: {}", form.env)))?;

        Ok(match exchange {
            Exchange::Binance => FollowerCredential::Binance {
                env,
                api_key: form.api_key,
                api_secret: form.api_secret,
            },
            Exchange::Bitget => FollowerCredential::Bitget {
                env,
                api_key: form.api_key,
                api_secret: form.api_secret,
                passphrase: form.passphrase,
            },
        })
    }

    /// Build the create-account request body. The name is required here.
    pub fn to_new_account(&self) -> Result<NewFollowerAccount, ClientError> {
        let form = self.trimmed();
        if form.name.is_empty() {
            return Err(ClientError::Validation("name must not be empty".into()));
        }
        let credential = form.to_credential()?;
        Ok(NewFollowerAccount {
            name: form.name,
            credential,
        })
    }
}
