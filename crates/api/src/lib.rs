#![deny(missing_docs)]
//! ANS API contains the wire types exchanged with an Agent Name Service
//! registry and the error type shared by every ANS crate.
//!
//! Signing and key management live in the `ans_core` crate, the http
//! client in `ans_registry_client`.

mod error;
pub use error::*;

mod timestamp;
pub use timestamp::*;

pub mod record;
pub use record::{AgentRecord, AgentRecordBuilder, Endpoints, ProofOfOwnership};

pub mod lookup;
pub use lookup::{AgentResult, LookupQuery, LookupResult, Verification};
