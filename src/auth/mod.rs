//! Session credential lifecycle: login, storage, refresh.
//!
//! The session credential is an opaque JWT pair issued by the backend's
//! login route. This module owns reading and replacing it; the api module
//! only reacts to the server's 401 signal.

pub mod credentials;
pub mod refresh;
pub mod session;

pub use credentials::CredentialStore;
pub use refresh::{Authenticator, LoginAuthenticator};
pub use session::{SessionData, SessionHandle, SessionStore};
