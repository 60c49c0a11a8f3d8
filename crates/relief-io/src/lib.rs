//! relief-io: async vectorization and editing sessions.
//!
//! Provides the lazily initialized tracer, the local and remote
//! [`Vectorizer`]s, and the [`Session`] that feeds vectorization
//! results into a [`relief_pipeline::Editor`] while discarding stale
//! ones.
//!
//! The pure pipeline lives in `relief-pipeline`; this crate adds the
//! tokio runtime glue and the HTTP client.

pub mod error;
pub mod remote;
pub mod session;
pub mod tracer;
pub mod vectorize;

pub use error::VectorizeError;
pub use remote::{BackendResponse, RemoteVectorizer};
pub use session::{RequestGate, Revectorized, Session};
pub use tracer::{BuiltinLoader, LazyTracer, TracerLoader};
pub use vectorize::{Backend, LocalVectorizer, Vectorized, Vectorizer};
