//! Auth handlers and supporting modules.
//!
//! This module coordinates the admission gate for protected routes, negotiate
//! ticket resolution, server-side sessions and the login/logout endpoints.
//!
//! ## Trusted Identity Header
//!
//! `POST /login` does not verify credentials. The reverse proxy in front of the
//! portal authenticates the user and injects `X-Remote-User: user@REALM` (the
//! header name is configurable). The proxy must strip any client-supplied copy
//! of that header, otherwise anyone can log in as anyone.

pub mod flash;
pub mod gate;
pub mod login;
pub mod logout;
pub mod negotiate;
pub mod principal;
pub mod session;
mod state;
mod utils;

pub use gate::{AuthDecision, CurrentUser, Gate, GateRequest, require_auth};
pub use negotiate::{
    DisabledResolver, HttpTicketResolver, NegotiateToken, PrincipalResolver, ResolutionFailed,
    ResolveFuture,
};
pub use principal::Principal;
pub use session::{MemorySessionStore, Session, SessionId, SessionStore};
pub use state::{AuthConfig, AuthState};
pub(crate) use utils::login_location;
