use std::sync::Arc;

use crate::gateway::Gateway;
use crate::oidc::TokenVerifier;

/// Authorization policy for the admission endpoint: which issuer tokens must
/// come from, and which claim must carry which value.
#[derive(Clone, Debug)]
pub struct AuthzSettings {
    pub issuer: String,
    pub claim: String,
    pub allowed_value: String,
}

#[derive(Clone)]
pub struct ApiState {
    pub gateway: Arc<Gateway>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub auth: AuthzSettings,
}
