//! # oauth-engine
//!
//! An embedded OAuth2 authorization server backed by a key-value store.
//!
//! ## Components
//!
//! - **Store:** the [`store::KvStore`] access contract and an in-memory backend.
//! - **Repository:** typed persistence of clients, users, grants and tokens.
//! - **Server:** the [`AuthorizationServer`] with its `authorize`, `access`
//!   and `info` entry points.
//! - **Response context:** renders every outcome as JSON or a redirect.

pub mod context;
pub mod credentials;
pub mod csrf;
pub mod error;
pub mod headers;
pub mod models;
pub mod options;
pub mod password;
pub mod random;
pub mod redirect;
pub mod repository;
pub mod request;
pub mod server;
pub mod store;

pub use context::{ResponseContext, ResponseKind};
pub use error::{EngineError, ErrorKind, Rejection};
pub use options::ServerOptions;
pub use request::OAuthRequest;
pub use server::{AuthorizationServer, AuthorizeOutcome, LoginPrompt};
pub use store::{KvStore, MemoryStore, StoreError};
