//! Canonical record signing.
//!
//! #### Canonical Form
//!
//! The bytes signed for a proof of ownership are the compact json
//! (no insignificant whitespace) of an object with exactly these keys,
//! in exactly this order:
//!
//! 1. `agent_id`
//! 2. `name`
//! 3. `description`
//! 4. `organization`
//! 5. `capabilities` (array, declaration order preserved)
//! 6. `endpoints` (object, keys in lexicographic byte order)
//! 7. `public_key`
//!
//! Strings are emitted as UTF-8 with serde_json's escaping (only `"`, `\`
//! and control characters are escaped). `proofOfOwnership` never appears,
//! whether or not the record being canonicalized carries one.
//!
//! The field order is part of the protocol. Do not reorder the fields of
//! `Canonical` or the signatures of existing records stop verifying.
//!
//! #### Signature
//!
//! ECDSA over P-256 with SHA-256, deterministic nonces (RFC 6979), ASN.1 DER
//! encoded and rendered as lowercase hex.

use crate::keys::import_public_key_pem;
use ans_api::*;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};

#[derive(serde::Serialize)]
struct Canonical<'a> {
    agent_id: &'a str,
    name: &'a str,
    description: &'a str,
    organization: &'a str,
    capabilities: &'a [String],
    endpoints: &'a Endpoints,
    public_key: &'a str,
}

impl<'a> From<&'a AgentRecord> for Canonical<'a> {
    fn from(r: &'a AgentRecord) -> Self {
        Self {
            agent_id: r.agent_id(),
            name: r.name(),
            description: r.description(),
            organization: r.organization(),
            capabilities: r.capabilities(),
            endpoints: r.endpoints(),
            public_key: r.public_key(),
        }
    }
}

/// Produce the canonical byte sequence of a record.
pub fn canonicalize(record: &AgentRecord) -> AnsResult<Vec<u8>> {
    serde_json::to_vec(&Canonical::from(record))
        .map_err(|e| AnsError::other_src("encoding canonical record", e))
}

/// Sign canonical bytes, returning the lowercase hex DER signature.
pub fn sign(signing_key: &SigningKey, canonical: &[u8]) -> AnsResult<String> {
    use p256::ecdsa::signature::Signer;

    let signature: Signature = signing_key
        .try_sign(canonical)
        .map_err(|e| AnsError::signing_failed("ecdsa p256 sha256", e))?;
    Ok(hex::encode(signature.to_der().as_bytes()))
}

/// Verify a lowercase (or uppercase) hex DER signature over canonical bytes.
///
/// Returns `false` for malformed hex, malformed DER and bad signatures.
pub fn verify(
    verifying_key: &VerifyingKey,
    canonical: &[u8],
    signature_hex: &str,
) -> bool {
    use p256::ecdsa::signature::Verifier;

    let der = match hex::decode(signature_hex) {
        Ok(der) => der,
        Err(_) => return false,
    };

    let signature = match Signature::from_der(&der) {
        Ok(signature) => signature,
        Err(_) => return false,
    };

    verifying_key.verify(canonical, &signature).is_ok()
}

/// Sign a record and attach the resulting proof, stamped with the
/// current time.
///
/// Any proof already on the record is replaced.
pub fn sign_record(
    signing_key: &SigningKey,
    record: AgentRecord,
) -> AnsResult<AgentRecord> {
    let canonical = canonicalize(&record)?;
    let signature = sign(signing_key, &canonical)?;

    tracing::debug!(agent_id = record.agent_id(), "signed agent record");

    Ok(record.with_proof(ProofOfOwnership {
        signature,
        timestamp: Timestamp::now(),
    }))
}

/// Check the attached proof against the public key embedded in the record.
///
/// Errors if the record is unsigned or its public key cannot be parsed.
/// Otherwise returns whether the signature is valid.
pub fn verify_record(record: &AgentRecord) -> AnsResult<bool> {
    let proof = record
        .proof_of_ownership()
        .ok_or_else(|| AnsError::unsigned(record.agent_id()))?;
    let verifying_key = import_public_key_pem(record.public_key())?;
    let canonical = canonicalize(record)?;
    Ok(verify(&verifying_key, &canonical, &proof.signature))
}

impl crate::P256KeyPair {
    /// Sign a record with this key pair. See [sign_record].
    pub fn sign_record(&self, record: AgentRecord) -> AnsResult<AgentRecord> {
        sign_record(self.signing_key(), record)
    }
}
