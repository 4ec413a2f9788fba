//! hubiC protocol descriptors

use duck_core::{OAuthConfig, Protocol, ProtocolType};

pub const DEFAULT_HOSTNAME: &str = "api.hubic.com";

/// Identifier of the hubiC vendor protocol
pub const IDENTIFIER: &str = "hubic";

/// The OpenStack Swift base protocol hubiC profiles derive from
pub fn swift() -> Protocol {
    Protocol::new(ProtocolType::Swift, "swift", "OpenStack Swift", "")
}

/// hubiC with its OAuth2 endpoints. The client registration is empty
/// unless supplied by a profile.
pub fn protocol() -> Protocol {
    Protocol::new(ProtocolType::Swift, IDENTIFIER, "hubiC", DEFAULT_HOSTNAME).with_oauth(
        OAuthConfig {
            authorization_url: "https://api.hubic.com/oauth/auth/".to_string(),
            token_url: "https://api.hubic.com/oauth/token/".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            scopes: vec!["credentials.r".to_string()],
        },
    )
}

/// True for protocols served by the hubiC session
pub fn is_hubic(protocol: &Protocol) -> bool {
    protocol.kind == ProtocolType::Swift && protocol.identifier.eq_ignore_ascii_case(IDENTIFIER)
}
