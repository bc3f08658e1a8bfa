//! Caller-supplied credentials.
//!
//! The client never creates credentials of its own; it only forwards the
//! bearer token and tenant discriminator it was handed.

use std::fmt;

/// Header carrying the tenant discriminator.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Bearer token and tenant id, both optional.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    bearer_token: Option<String>,
    tenant_id: Option<String>,
}

impl Credentials {
    /// No credentials at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Credentials with a bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
            tenant_id: None,
        }
    }

    /// Build from optional parts, treating blank strings as absent.
    pub fn from_parts(bearer_token: Option<String>, tenant_id: Option<String>) -> Self {
        Self {
            bearer_token: bearer_token.filter(|t| !t.trim().is_empty()),
            tenant_id: tenant_id.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Set the tenant discriminator.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// The bearer token, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// The tenant id, if any.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Header pairs for whatever was supplied.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(2);
        if let Some(token) = &self.bearer_token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        if let Some(tenant) = &self.tenant_id {
            headers.push((TENANT_HEADER.to_string(), tenant.clone()));
        }
        headers
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_parts_are_dropped() {
        let creds = Credentials::from_parts(Some("  ".into()), Some(String::new()));
        assert_eq!(creds, Credentials::none());
        assert!(creds.headers().is_empty());
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials::bearer("secret-token");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
