//! Shared request/response plumbing for flowunit units.
//!
//! This crate is used by both execution paths of a unit:
//! - the batch path (one request per input record)
//! - the tool path (one request per agent call)
//!
//! It intentionally contains **no** host or agent integration; callers hand it resolved argument
//! values and a transport.

pub mod config;
pub mod envelope;
pub mod error;
pub mod request;
pub mod response_shaping;
pub mod safety;
pub mod semantics;
pub mod transport;

pub use envelope::ResponseEnvelope;
pub use error::{HttpToolsError, Result};
pub use request::{ArgumentBinding, CountBounds, QueryPair, RequestSpec, RequestTemplate};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};
