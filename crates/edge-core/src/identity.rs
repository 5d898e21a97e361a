//! Agent identity and secret handling.

use std::fmt;
use zeroize::Zeroizing;

use crate::error::CoreError;

/// A shared secret that never appears in logs or Debug output.
///
/// The inner buffer is zeroed on drop.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Raw bytes for MAC computation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Explicit access to the secret string.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Identity of this agent process: its Bus-registered id and shared secret.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    pub agent_id: String,
    pub secret: Secret,
}

impl AgentIdentity {
    /// Build a validated identity. Empty ids and empty secrets are fatal at
    /// startup rather than producing unsigned traffic later.
    pub fn new(agent_id: impl Into<String>, secret: Secret) -> Result<Self, CoreError> {
        let agent_id = agent_id.into();
        if agent_id.trim().is_empty() {
            return Err(CoreError::InvalidIdentity("agent_id is empty".to_string()));
        }
        if secret.is_empty() {
            return Err(CoreError::InvalidIdentity(
                "shared secret is empty".to_string(),
            ));
        }
        Ok(Self { agent_id, secret })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
    }

    #[test]
    fn test_identity_rejects_empty_fields() {
        assert!(AgentIdentity::new("", Secret::new("k")).is_err());
        assert!(AgentIdentity::new("edge-1", Secret::new("")).is_err());
        assert!(AgentIdentity::new("edge-1", Secret::new("k")).is_ok());
    }
}
