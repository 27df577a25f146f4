//! Admin operations core for municipal issue tracking.
//!
//! Citizens report civic issues through a separate mobile app; this crate
//! is the admin side: typed access to the hosted backend, the live map
//! synchronization layer (issue heatmap + worker location overlay, kept
//! current from the backend's change feed), and the dispatch/onboarding/
//! analytics services around it. The UI shell, authentication, and the
//! mapping renderer are external — this crate produces view models and
//! consumes an opaque admin identity.

pub mod backend;
pub mod config;
pub mod error;
pub mod livemap;
pub mod services;
pub mod types;

pub use backend::{BackendClient, RealtimeClient, Subscription};
pub use config::Config;
pub use error::{BackendError, ServiceError};
pub use livemap::{LiveMap, MapScene, MarkerFilter};
