//! Envelope parameters: where a message goes and what it is rendered with.
//!
//! An [`Envelope`] carries no recipient data. The embedding application owns
//! one parameters record per envelope and exposes it through
//! [`EnvelopeParams`], injected into the [`Dispatcher`](crate::Dispatcher).

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::ParamsError;
use crate::model::{Envelope, EnvelopeId};

/// Variables available to a template body.
pub type Context = Map<String, Value>;

/// Context key holding the access token.
pub const TOKEN_KEY: &str = "token";

/// Context key the resolved access URL is injected under.
pub const URL_KEY: &str = "url";

/// Default length of tokens from [`generate_token`].
pub const TOKEN_LENGTH: usize = 32;

/// Random alphanumeric token, e.g. for personal access links.
pub fn generate_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Resolves an envelope's recipient and render context.
///
/// Both lookups must fail with [`ParamsError::Unavailable`] when the
/// envelope has no parameters record.
#[async_trait]
pub trait EnvelopeParams: Send + Sync {
    /// Destination address.
    async fn address(&self, envelope: &Envelope) -> Result<String, ParamsError>;

    /// Template variables.
    async fn context(&self, envelope: &Envelope) -> Result<Context, ParamsError>;
}

/// One parameters record held by [`MapParams`].
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub address: String,
    pub context: Context,
}

impl Params {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            context: Context::new(),
        }
    }

    /// Add a template variable.
    pub fn var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Add a freshly generated [`TOKEN_KEY`] variable.
    pub fn with_token(self) -> Self {
        self.var(TOKEN_KEY, generate_token(TOKEN_LENGTH))
    }

    pub fn token(&self) -> Option<&str> {
        self.context.get(TOKEN_KEY).and_then(Value::as_str)
    }
}

/// In-memory parameters keyed by envelope id.
#[derive(Debug, Default)]
pub struct MapParams {
    records: RwLock<HashMap<EnvelopeId, Params>>,
}

impl MapParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for an envelope.
    pub fn insert(&self, envelope: EnvelopeId, params: Params) {
        self.records.write().insert(envelope, params);
    }

    /// Change the recipient of an existing record.
    pub fn set_address(&self, envelope: EnvelopeId, address: impl Into<String>) -> Result<(), ParamsError> {
        match self.records.write().get_mut(&envelope) {
            Some(params) => {
                params.address = address.into();
                Ok(())
            }
            None => Err(ParamsError::Unavailable(envelope)),
        }
    }

    pub fn remove(&self, envelope: EnvelopeId) -> Option<Params> {
        self.records.write().remove(&envelope)
    }

    pub fn get(&self, envelope: EnvelopeId) -> Option<Params> {
        self.records.read().get(&envelope).cloned()
    }

    fn lookup(&self, envelope: &Envelope) -> Result<Params, ParamsError> {
        self.get(envelope.id).ok_or(ParamsError::Unavailable(envelope.id))
    }
}

#[async_trait]
impl EnvelopeParams for MapParams {
    async fn address(&self, envelope: &Envelope) -> Result<String, ParamsError> {
        Ok(self.lookup(envelope)?.address)
    }

    async fn context(&self, envelope: &Envelope) -> Result<Context, ParamsError> {
        Ok(self.lookup(envelope)?.context)
    }
}

#[async_trait]
impl<P: EnvelopeParams + ?Sized> EnvelopeParams for std::sync::Arc<P> {
    async fn address(&self, envelope: &Envelope) -> Result<String, ParamsError> {
        (**self).address(envelope).await
    }

    async fn context(&self, envelope: &Envelope) -> Result<Context, ParamsError> {
        (**self).context(envelope).await
    }
}
