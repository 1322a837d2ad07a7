//! Client-side session core for the DNC compliance portal.
//!
//! # Purpose
//! Resolves the effective role of the signed-in user, holds the shared session
//! state every view reads from, and wraps the backend's identity and DNC
//! request endpoints.
//!
//! # How it fits
//! A front end creates one [`Session`] per signed-in tab, hands it to a
//! [`RoleResolver`] on mount, and gates its navigation with
//! [`portal_authz::visible_sections`] on [`Session::effective_role`].
//! Only the resolver and the [`overrides`] functions write role state.
//!
//! # Key invariants
//! - A session's base role is written at most once per sign-in.
//! - Concurrent resolutions of one session share a single backend call.
//! - Results of a resolution started before sign-out are discarded.
pub mod config;
pub mod credentials;
pub mod dnc;
pub mod errors;
pub mod http;
pub mod identity;
pub mod overrides;
pub mod resolver;
pub mod session;

pub use config::ClientConfig;
pub use credentials::Credentials;
pub use dnc::{
    DncCheckResult, DncClient, DncRequest, NormalizedNumbers, PhoneNumber, RequestPage,
    RequestStatus, normalize_numbers,
};
pub use errors::{ClientError, ClientResult};
pub use http::PortalHttp;
pub use identity::{HttpIdentitySource, IdentityResponse, IdentitySource};
pub use resolver::{RoleResolution, RoleResolver};
pub use session::{Principal, Session, SessionSnapshot};
