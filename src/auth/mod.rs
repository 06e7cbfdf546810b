//! Delegated token authentication.
//!
//! The auth service owns credential verification: [`Authority`] validates
//! email/password pairs, issues signed tokens, and resolves tokens back to
//! identities. Other services never verify credentials themselves; their
//! [`Authenticated`] guard forwards the caller's bearer credential to the
//! authority over RPC and admits or rejects the request on the answer.

mod authority;
mod client;
mod cookie;
mod guard;
mod rpc;

pub use authority::{AuthError, Authority, Identity};
pub use client::{AuthClient, AuthDelegateError};
pub use cookie::get_cookie;
pub use guard::{Authenticated, Credential, GuardRejection, HasAuthDelegate, CREDENTIAL_NAME, extract_credential};
pub use rpc::{AUTHENTICATE_OP, AuthenticateRequest, AuthorityRpc};
