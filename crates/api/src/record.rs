//! Types dealing with agent registration records.
//!
//! [AgentRecord] is the unit of registration. It is built once through
//! [AgentRecord::builder] and is immutable afterwards. The only transition
//! a record goes through is attaching a [ProofOfOwnership] with
//! [AgentRecord::with_proof], which consumes the unsigned record.
//!
//! #### Wire Schema
//!
//! ```json
//! {
//!   "agent_id": "my-smart-agent.ans",
//!   "name": "My Smart AI Agent",
//!   "description": "An agent that can.....",
//!   "organization": "My Org",
//!   "capabilities": ["search_capability", "test2_feature"],
//!   "endpoints": {
//!     "a2a": "https://smartai.test.com/a2a",
//!     "rest": "https://smartai.test.com/api/v1"
//!   },
//!   "public_key": "-----BEGIN PUBLIC KEY-----\n...",
//!   "proofOfOwnership": {
//!     "signature": "3045...",
//!     "timestamp": "2025-06-01T12:30:00.123Z"
//!   }
//! }
//! ```
//!
//! Note the `proofOfOwnership` key is camelCase while every other key is
//! snake_case.

use crate::Timestamp;
use std::collections::BTreeMap;

/// Protocol name to endpoint url.
///
/// A sorted map, so iteration and serialization order depend only on
/// the keys themselves.
pub type Endpoints = BTreeMap<String, String>;

/// A signature plus timestamp attesting that the holder of the private key
/// matching [AgentRecord::public_key] authored the record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProofOfOwnership {
    /// Lowercase hex of the DER encoded ECDSA signature over the
    /// canonical form of the record.
    pub signature: String,

    /// When the signature was produced.
    pub timestamp: Timestamp,
}

/// An agent identity record as submitted to the registry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AgentRecord {
    agent_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    organization: String,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    endpoints: Endpoints,
    #[serde(default)]
    public_key: String,
    #[serde(
        rename = "proofOfOwnership",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    proof_of_ownership: Option<ProofOfOwnership>,
}

impl AgentRecord {
    /// Start building a record for the given agent id.
    pub fn builder(agent_id: impl Into<String>) -> AgentRecordBuilder {
        AgentRecordBuilder {
            agent_id: agent_id.into(),
            name: String::new(),
            description: String::new(),
            organization: String::new(),
            capabilities: Vec::new(),
            endpoints: Endpoints::new(),
            public_key: String::new(),
        }
    }

    /// The globally scoped agent identifier, e.g. `my-agent.ans`.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-text description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Owning organization.
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Capability tags, in declaration order.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Protocol name to url.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// PEM encoded public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// The proof of ownership, if this record has been signed.
    pub fn proof_of_ownership(&self) -> Option<&ProofOfOwnership> {
        self.proof_of_ownership.as_ref()
    }

    /// Whether a proof of ownership is attached.
    pub fn is_signed(&self) -> bool {
        self.proof_of_ownership.is_some()
    }

    /// Attach a proof of ownership, replacing any previous one.
    pub fn with_proof(self, proof: ProofOfOwnership) -> Self {
        Self {
            proof_of_ownership: Some(proof),
            ..self
        }
    }

    /// Return a copy of this record with the proof removed.
    pub fn without_proof(&self) -> Self {
        Self {
            proof_of_ownership: None,
            ..self.clone()
        }
    }

    /// Re-open this record for editing. Any proof is dropped, since
    /// it would no longer match.
    pub fn to_builder(&self) -> AgentRecordBuilder {
        AgentRecordBuilder {
            agent_id: self.agent_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            organization: self.organization.clone(),
            capabilities: self.capabilities.clone(),
            endpoints: self.endpoints.clone(),
            public_key: self.public_key.clone(),
        }
    }

    /// Encode the full record, including any proof, as registry json.
    pub fn encode(&self) -> crate::AnsResult<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::AnsError::other_src("encoding agent record", e))
    }
}

/// Builder for [AgentRecord].
#[derive(Debug, Clone)]
pub struct AgentRecordBuilder {
    agent_id: String,
    name: String,
    description: String,
    organization: String,
    capabilities: Vec<String>,
    endpoints: Endpoints,
    public_key: String,
}

impl AgentRecordBuilder {
    /// Set the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the organization.
    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    /// Append a capability tag.
    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Append several capability tags.
    pub fn capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    /// Set the url for a protocol, replacing any previous one.
    pub fn endpoint(
        mut self,
        protocol: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        self.endpoints.insert(protocol.into(), url.into());
        self
    }

    /// Set the PEM encoded public key.
    pub fn public_key(mut self, public_key_pem: impl Into<String>) -> Self {
        self.public_key = public_key_pem.into();
        self
    }

    /// Finish building an unsigned record.
    pub fn build(self) -> AgentRecord {
        AgentRecord {
            agent_id: self.agent_id,
            name: self.name,
            description: self.description,
            organization: self.organization,
            capabilities: self.capabilities,
            endpoints: self.endpoints,
            public_key: self.public_key,
            proof_of_ownership: None,
        }
    }
}
