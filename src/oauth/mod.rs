//! OAuth2 client side of the service: identity provider calls and token payloads.

pub mod claims;
pub mod issuer;
pub mod types;

pub use claims::UnverifiedClaims;
pub use issuer::{KeycloakClient, TokenIssuer};
pub use types::{Credentials, LOGIN_SCOPE, TokenSet, UserInfo};
