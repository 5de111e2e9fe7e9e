// Concrete implementations of the domain ports: Google REST APIs and credential sources.

pub mod auth;
pub mod http;

pub use auth::{ConfiguredAuthProvider, EnvAuthProvider, HttpAuthProvider, StaticAuthProvider};
pub use http::GcpRestClient;
