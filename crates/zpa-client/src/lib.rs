//! Blocking REST client for the ZPA management API
//!
//! [`RestClient`] implements [`reconcile::RemoteApi`], so the lifecycle
//! controller can drive real objects with it exactly as tests drive
//! [`reconcile::MockApi`].
//!
//! # Example
//!
//! ```no_run
//! use reconcile::RemoteApi;
//! use zpa_client::{ClientConfig, RestClient};
//!
//! let config = ClientConfig::new(
//!     "https://config.private.zscaler.com",
//!     "216196257331281920",
//!     "client-id",
//!     "client-secret",
//! );
//! let client = RestClient::new(config);
//! let group = client.get("segmentGroup", "72058304855015574").unwrap();
//! println!("{}", group["name"]);
//! ```

pub mod auth;
mod client;

pub use client::{ClientConfig, RestClient, classify};
