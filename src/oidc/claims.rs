//! Bearer-token claims.
//!
//! Every standard claim here is optional-but-checked: a claim that is absent
//! from the token is treated as "not required", while a claim that is present
//! must hold. Time claims are validated with no clock-skew tolerance.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::VerifyError;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// Application-level claims (group membership and the like), kept for
    /// authorization decisions beyond authentication.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Validate `exp`, `iat` and `nbf` against `now`, skew-free. Each claim
    /// is only enforced if present.
    pub fn validate_time(&self, now: DateTime<Utc>) -> Result<(), VerifyError> {
        let now = now.timestamp();
        if let Some(exp) = self.exp {
            if now > exp {
                return Err(VerifyError::Expired { by_secs: now - exp });
            }
        }
        if let Some(iat) = self.iat {
            if now < iat {
                return Err(VerifyError::UsedBeforeIssued);
            }
        }
        if let Some(nbf) = self.nbf {
            if now < nbf {
                return Err(VerifyError::NotYetValid);
            }
        }
        Ok(())
    }

    pub fn require_issuer(&self, expected: &str) -> Result<(), VerifyError> {
        match &self.iss {
            Some(iss) if iss != expected => Err(VerifyError::IssuerMismatch {
                expected: expected.to_string(),
                found: iss.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub fn require_typ(&self, expected: &str) -> Result<(), VerifyError> {
        match &self.typ {
            Some(typ) if typ != expected => Err(VerifyError::TypeMismatch {
                expected: expected.to_string(),
                found: typ.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Look up an application-level string claim.
    pub fn string_claim(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(Value::as_str)
    }
}
