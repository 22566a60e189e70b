//! Session lifecycle and authenticated request pipeline for the freelance management
//! dashboard backend.

pub mod config;
pub mod error;
/// Scripted transport for tests. Enabled by the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
pub mod fake_transport;
pub mod guard;
pub mod identity;
pub mod navigation;
pub mod request;
pub mod resources;
pub mod session;
pub mod token;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use identity::{Identity, Role, UserId};
pub use request::{ApiClient, Attempt, RefreshPolicy, RequestOptions};
pub use session::{LoginError, SessionManager, SessionPhase, SessionSnapshot, SessionView};
pub use token::TokenStore;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
