//! Gather REST client
//!
//! [`GatherClient`] wraps a cookie-carrying `reqwest` client and a
//! [`gather_core::Session`]. Outgoing requests carry the session's bearer
//! token, a 401 triggers one shared reissue and a single retry, and the
//! backend's loosely shaped responses are normalized into the types in
//! [`types`].

pub mod client;
pub mod types;

pub use client::categories::DEFAULT_CATEGORIES;
pub use client::cookies::CookieJar;
pub use client::error::ClientError;
pub use client::issuer::HttpTokenIssuer;
pub use client::{GatherClient, GatherClientBuilder};
