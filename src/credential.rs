//! App and shop credentials, and the check run on them before a client is built.

use crate::error::{FieldError, FieldErrorReason, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The identifiers needed to authenticate against the platform.
///
/// `client_id` and `client_secret` are required unless signing is skipped for
/// the client being built; `access_token` and `shop_id` are optional.
///
/// The `Debug` output masks the secret and the access token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The application id.
    #[serde(default)]
    pub client_id: Option<String>,
    /// The application secret.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// The shop access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// The shop id.
    #[serde(default)]
    pub shop_id: Option<String>,
}

impl Credential {
    /// Creates a credential with the two required fields set.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            access_token: None,
            shop_id: None,
        }
    }

    /// Sets the access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the shop id.
    pub fn with_shop_id(mut self, shop_id: impl Into<String>) -> Self {
        self.shop_id = Some(shop_id.into());
        self
    }

    /// Shallow-merges `overrides` on top of `self`.
    ///
    /// Each field set on the override wins; unset fields fall back to `self`.
    pub fn merge(&self, overrides: &CredentialOverride) -> Credential {
        Credential {
            client_id: overrides.client_id.clone().or_else(|| self.client_id.clone()),
            client_secret: overrides
                .client_secret
                .clone()
                .or_else(|| self.client_secret.clone()),
            access_token: overrides
                .access_token
                .clone()
                .or_else(|| self.access_token.clone()),
            shop_id: overrides.shop_id.clone().or_else(|| self.shop_id.clone()),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "*****"))
            .field("access_token", &self.access_token.as_ref().map(|_| "*****"))
            .field("shop_id", &self.shop_id)
            .finish()
    }
}

/// A partial credential applied over the process-wide default.
pub type CredentialOverride = Credential;

/// Checks the merged credential for a client about to be built.
///
/// With `skip_signing` set the check is bypassed and no credential is carried
/// downstream. Otherwise `client_id` and `client_secret` must be present and
/// non-empty, and the credential is returned unchanged.
pub fn validate(
    credential: Credential,
    skip_signing: bool,
) -> Result<Option<Credential>, ValidationError> {
    if skip_signing {
        return Ok(None);
    }

    let fields: Vec<FieldError> = [
        ("client_id", credential.client_id.as_deref()),
        ("client_secret", credential.client_secret.as_deref()),
    ]
    .into_iter()
    .filter_map(|(field, value)| required(field, value))
    .collect();

    if fields.is_empty() {
        Ok(Some(credential))
    } else {
        Err(ValidationError { fields })
    }
}

fn required(field: &'static str, value: Option<&str>) -> Option<FieldError> {
    let reason = match value {
        None => FieldErrorReason::Missing,
        Some("") => FieldErrorReason::Empty,
        Some(_) => return None,
    };
    Some(FieldError { field, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_override_wins_per_field() {
        let defaults = Credential::new("app", "secret").with_shop_id("shop-1");
        let overrides = CredentialOverride {
            client_secret: Some("other-secret".to_string()),
            access_token: Some("token".to_string()),
            ..Default::default()
        };

        let merged = defaults.merge(&overrides);

        assert_eq!(merged.client_id.as_deref(), Some("app"));
        assert_eq!(merged.client_secret.as_deref(), Some("other-secret"));
        assert_eq!(merged.access_token.as_deref(), Some("token"));
        assert_eq!(merged.shop_id.as_deref(), Some("shop-1"));
    }

    #[test]
    fn test_validate_accepts_required_fields() {
        let credential = Credential::new("a", "b");
        let validated = validate(credential.clone(), false).unwrap();
        assert_eq!(validated, Some(credential));
    }

    #[test]
    fn test_validate_reports_every_missing_field() {
        let err = validate(Credential::default(), false).unwrap_err();
        assert_eq!(err.field_names(), vec!["client_id", "client_secret"]);
        assert!(err
            .fields
            .iter()
            .all(|f| f.reason == FieldErrorReason::Missing));
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let err = validate(Credential::new("a", ""), false).unwrap_err();
        assert_eq!(
            err.fields,
            vec![FieldError {
                field: "client_secret",
                reason: FieldErrorReason::Empty,
            }]
        );
        assert!(err.contains("client_secret"));
        assert!(!err.contains("client_id"));
    }

    #[test]
    fn test_validate_accepts_whitespace_values() {
        let credential = Credential::new(" ", "  ");
        let validated = validate(credential.clone(), false).unwrap();
        assert_eq!(validated, Some(credential));
    }

    #[test]
    fn test_validate_skipped_drops_credential() {
        assert_eq!(validate(Credential::default(), true).unwrap(), None);
        assert_eq!(validate(Credential::new("a", "b"), true).unwrap(), None);
    }

    #[test]
    fn test_debug_masks_secrets() {
        let credential = Credential::new("app", "hunter2").with_access_token("tok");
        let debug = format!("{:?}", credential);
        assert!(debug.contains("app"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("tok\""));
    }
}
