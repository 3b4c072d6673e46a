//! SPTrans Olho Vivo integration for MobilizaSP
//!
//! Provides line search, stop search, vehicle positions and arrival
//! predictions for São Paulo buses via the
//! [Olho Vivo](https://www.sptrans.com.br/desenvolvedores/) API.
//!
//! # Architecture
//!
//! [`TransitSession`] owns the session cookie issued by the login endpoint.
//! It performs at most one login at a time, renews the session once when an
//! authenticated call is rejected, and retries transient failures according
//! to an injected [`RetryPolicy`]. [`SptransClient`] defines the typed
//! endpoint operations, implemented by [`OlhoVivoClient`] on top of the
//! session.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_sptrans::{OlhoVivoClient, SptransClient, SptransConfig};
//!
//! let config = SptransConfig::default().with_token(token);
//! let client = OlhoVivoClient::new(&config)?;
//!
//! let lines = client.search_lines("701U").await?;
//! let positions = client.vehicle_positions(lines[0].code).await?;
//! ```

mod client;
mod config;
mod error;
mod models;
mod retry;
mod session;

pub use client::{OlhoVivoClient, SptransClient};
pub use config::SptransConfig;
pub use error::SptransError;
pub use models::{RawLine, RawStop, parse_lines, parse_stops};
pub use retry::{
    ExponentialBackoff, RetryConfig, RetryContext, RetryDecision, RetryPolicy, is_idempotent,
};
pub use session::{SessionToken, TransitSession};
