#![deny(missing_docs)]
//! ANS core: P-256 key management and canonical signing of agent records.
//!
//! The typical registration flow:
//!
//! ```no_run
//! # fn main() -> ans_api::AnsResult<()> {
//! use ans_api::AgentRecord;
//! use ans_core::P256KeyPair;
//!
//! let key_pair = P256KeyPair::generate()?;
//! key_pair.write_private_key_pem("ans-private_key.pem")?;
//!
//! let record = AgentRecord::builder("my-smart-agent.ans")
//!     .name("My Smart AI Agent")
//!     .capability("search_capability")
//!     .endpoint("a2a", "https://smartai.test.com/a2a")
//!     .public_key(key_pair.public_key_pem()?)
//!     .build();
//!
//! let signed = key_pair.sign_record(record)?;
//! assert!(ans_core::verify_record(&signed)?);
//! # Ok(())
//! # }
//! ```

pub mod keys;
pub use keys::{
    export_private_key_pem, export_public_key_pem, import_private_key_pem,
    import_public_key_pem, P256KeyPair,
};

pub mod sign;
pub use sign::{canonicalize, sign, sign_record, verify, verify_record};

pub use p256::ecdsa::{SigningKey, VerifyingKey};
