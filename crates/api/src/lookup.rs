//! Types dealing with registry lookups.
//!
//! A lookup is a `GET /lookup` with a flat set of query parameters,
//! built with [LookupQuery]. The registry answers one page at a time
//! with a [LookupResult]. Paging is driven by the caller: feed
//! [LookupResult::next_page_token] back into [LookupQuery::page_token]
//! until [LookupResult::has_next_page] is `false`.
//!
//! Response parsing is forgiving. Unknown properties are
//! ignored and missing or `null` properties fall back to empty values.

use std::collections::BTreeMap;

/// Deserialize `null` as the type's default value.
mod serde_null_default {
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: Default + serde::Deserialize<'de>,
    {
        let v: Option<T> = serde::Deserialize::deserialize(deserializer)?;
        Ok(v.unwrap_or_default())
    }
}

/// Query parameters for a registry lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupQuery {
    /// Exact agent id match.
    pub agent_id: Option<String>,

    /// Prefix search on the agent name.
    pub query: Option<String>,

    /// Every listed capability must be present on a match.
    pub capabilities: Vec<String>,

    /// Verification level filter, e.g. `provisional` or `verified`.
    pub trust_level: Option<String>,

    /// Page size. The registry defaults to 10.
    pub limit: Option<u32>,

    /// Json policy requirements, e.g. `{"verification_status":"verified"}`.
    pub policy_requirements: Option<String>,

    /// Continuation cursor from a previous [LookupResult].
    pub page_token: Option<String>,

    /// Additional raw parameters, sent after the typed ones.
    pub extra: Vec<(String, String)>,
}

impl LookupQuery {
    /// Look up a single agent by id.
    pub fn by_agent_id(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Default::default()
        }
    }

    /// Set the name prefix query.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Require a capability.
    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Set the trust level filter.
    pub fn trust_level(mut self, trust_level: impl Into<String>) -> Self {
        self.trust_level = Some(trust_level.into());
        self
    }

    /// Set the page size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the json policy requirements.
    pub fn policy_requirements(mut self, policy: impl Into<String>) -> Self {
        self.policy_requirements = Some(policy.into());
        self
    }

    /// Set (or clear) the continuation cursor.
    pub fn page_token(mut self, token: Option<String>) -> Self {
        self.page_token = token;
        self
    }

    /// Append a raw parameter.
    pub fn param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Render the query as ordered `(key, value)` pairs.
    ///
    /// Parameters with an empty value are left out, matching how the
    /// registry filters its input.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();

        let mut push = |k: &str, v: Option<String>| {
            if let Some(v) = v {
                if !v.is_empty() {
                    out.push((k.to_string(), v));
                }
            }
        };

        push("agent_id", self.agent_id.clone());
        push("query", self.query.clone());
        if !self.capabilities.is_empty() {
            push("capabilities", Some(self.capabilities.join(",")));
        }
        push("trust_level", self.trust_level.clone());
        push("limit", self.limit.map(|l| l.to_string()));
        push("policy_requirements", self.policy_requirements.clone());
        push("page_token", self.page_token.clone());

        for (k, v) in self.extra.iter() {
            push(k.as_str(), Some(v.clone()));
        }

        out
    }
}

/// Verification state the registry holds for an agent.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(default)]
pub struct Verification {
    /// Trust level, e.g. `provisional`.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub level: String,

    /// When the level was last assigned, if known.
    pub timestamp: Option<String>,

    /// Blockchain anchoring proof, if any.
    pub blockchain_proof: Option<BTreeMap<String, String>>,
}

/// The registry's view of a registered agent.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(default)]
pub struct AgentResult {
    /// Agent id.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub agent_id: String,

    /// Decentralized identifier assigned by the registry.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub did: String,

    /// Display name.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub name: String,

    /// Description.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub description: String,

    /// Organization.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub organization: String,

    /// PEM encoded public key, if the registry returns it.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub public_key: String,

    /// Protocol name to url.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub endpoints: BTreeMap<String, String>,

    /// Capability tags.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub capabilities: Vec<String>,

    /// Verification state.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub verification: Verification,

    /// Whether the agent satisfies the requested policy requirements.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub policy_compatibility: bool,
}

/// One page of lookup results.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(default)]
pub struct LookupResult {
    /// Registry status string, e.g. `success`.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub status: String,

    /// Matching agents, in registry order.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub results: Vec<AgentResult>,

    /// Count of matches in this response.
    #[serde(deserialize_with = "serde_null_default::deserialize")]
    pub total_matches: u64,

    /// Continuation cursor. Absent, `null` or empty when exhausted.
    pub next_page_token: Option<String>,
}

impl LookupResult {
    /// Decode a registry lookup response body.
    pub fn decode(body: &str) -> crate::AnsResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| crate::AnsError::malformed_response(body, e))
    }

    /// Whether the registry indicated a further page.
    pub fn has_next_page(&self) -> bool {
        self.next_page_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }

    /// The continuation cursor, normalized so an empty token is `None`.
    pub fn next_page(&self) -> Option<String> {
        if self.has_next_page() {
            self.next_page_token.clone()
        } else {
            None
        }
    }
}
