use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DispatchError;

/// The user a flow runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
  pub email: String,
  pub display_name: Option<String>,
}

impl Principal {
  pub fn new(email: impl Into<String>) -> Self {
    Self {
      email: email.into(),
      display_name: None,
    }
  }
}

/// Source of per-principal secrets for integrations.
#[async_trait]
pub trait CredentialStore: Send + Sync {
  /// Look up the secret `principal` uses for the integration `short_name`.
  async fn credential(
    &self,
    principal: &Principal,
    short_name: &str,
  ) -> Result<Option<String>, DispatchError>;
}

/// Credentials held in memory.
///
/// Secrets registered with [`InMemoryCredentials::shared`] apply to every
/// principal unless a principal-specific one exists.
#[derive(Debug, Default)]
pub struct InMemoryCredentials {
  per_principal: RwLock<HashMap<(String, String), String>>,
  shared: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentials {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn insert(&self, principal: &Principal, short_name: &str, secret: impl Into<String>) {
    self.per_principal.write().await.insert(
      (principal.email.clone(), short_name.to_string()),
      secret.into(),
    );
  }

  pub async fn shared(&self, short_name: &str, secret: impl Into<String>) {
    self
      .shared
      .write()
      .await
      .insert(short_name.to_string(), secret.into());
  }
}

#[async_trait]
impl CredentialStore for InMemoryCredentials {
  async fn credential(
    &self,
    principal: &Principal,
    short_name: &str,
  ) -> Result<Option<String>, DispatchError> {
    let key = (principal.email.clone(), short_name.to_string());
    if let Some(secret) = self.per_principal.read().await.get(&key) {
      return Ok(Some(secret.clone()));
    }
    Ok(self.shared.read().await.get(short_name).cloned())
  }
}

/// What an integration receives when it is constructed.
#[derive(Clone)]
pub struct IntegrationContext {
  pub principal: Principal,
  credentials: Arc<dyn CredentialStore>,
}

impl IntegrationContext {
  pub fn new(principal: Principal, credentials: Arc<dyn CredentialStore>) -> Self {
    Self {
      principal,
      credentials,
    }
  }

  pub async fn credential(&self, short_name: &str) -> Result<Option<String>, DispatchError> {
    self
      .credentials
      .credential(&self.principal, short_name)
      .await
  }

  /// Like [`credential`](Self::credential) but a missing secret is an error.
  pub async fn require_credential(&self, short_name: &str) -> Result<String, DispatchError> {
    self
      .credential(short_name)
      .await?
      .ok_or_else(|| DispatchError::MissingCredential {
        short_name: short_name.to_string(),
        principal: self.principal.email.clone(),
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_principal_secret_wins_over_shared() {
    let store = Arc::new(InMemoryCredentials::new());
    let alice = Principal::new("alice@example.com");
    let bob = Principal::new("bob@example.com");

    store.shared("trello", "team-token").await;
    store.insert(&alice, "trello", "alice-token").await;

    let ctx = IntegrationContext::new(alice, store.clone());
    assert_eq!(ctx.require_credential("trello").await.unwrap(), "alice-token");

    let ctx = IntegrationContext::new(bob, store);
    assert_eq!(ctx.require_credential("trello").await.unwrap(), "team-token");
  }

  #[tokio::test]
  async fn test_missing_credential() {
    let ctx = IntegrationContext::new(
      Principal::new("carol@example.com"),
      Arc::new(InMemoryCredentials::new()),
    );

    let err = ctx.require_credential("slack").await.unwrap_err();
    assert!(matches!(err, DispatchError::MissingCredential { .. }));
  }
}
