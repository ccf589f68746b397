//! A blocking client for Agent Name Service registries.
//!
//! Two calls are supported: registering a signed
//! [AgentRecord] with `POST {base}/register`, and querying
//! the registry with `GET {base}/lookup`. Neither call retries; every
//! failure is reported to the caller with the registry's response
//! preserved.

#![deny(missing_docs)]

use ans_api::*;
use url::Url;

mod config;
pub use config::*;

/// A registry client.
///
/// Cheap to clone, and safe to share between threads. Clones share one
/// connection pool.
#[derive(Clone)]
pub struct RegistryClient {
    server_url: Url,
    agent: ureq::Agent,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("server_url", &self.server_url.as_str())
            .finish()
    }
}

impl RegistryClient {
    /// Construct a client from a validated configuration.
    pub fn new(config: &RegistryClientConfig) -> AnsResult<Self> {
        let server_url = config.validate()?;

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build();

        Ok(Self { server_url, agent })
    }

    /// Construct a client with default settings for the given registry.
    pub fn with_server_url(server_url: &str) -> AnsResult<Self> {
        Self::new(&RegistryClientConfig::with_server_url(server_url))
    }

    /// The registry base url.
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    fn endpoint(&self, name: &str) -> Url {
        let mut url = self.server_url.clone();
        let path = format!("{}/{name}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url
    }

    /// Submit a signed record to the registry, returning the raw response
    /// body on success.
    ///
    /// A record without a proof of ownership is refused before anything is
    /// sent.
    ///
    /// Note the `blocking_` prefix. This is a hint to the caller that if the
    /// function is used in an async context, it should be treated as a
    /// blocking operation.
    pub fn blocking_register(
        &self,
        record: &AgentRecord,
    ) -> AnsResult<String> {
        if !record.is_signed() {
            return Err(AnsError::unsigned(record.agent_id()));
        }

        let url = self.endpoint("register");
        let encoded = record.encode()?;

        tracing::debug!(
            agent_id = record.agent_id(),
            %url,
            "registering agent"
        );

        let res = self
            .agent
            .post(url.as_str())
            .set("Content-Type", "application/json")
            .send_string(&encoded);

        let (status, status_text, body) =
            read_response(res, "registering agent")?;

        if !(200..300).contains(&status) {
            tracing::warn!(
                agent_id = record.agent_id(),
                status,
                %body,
                "registration rejected"
            );
            return Err(AnsError::registration_rejected(
                status,
                &status_text,
                &body,
            ));
        }

        tracing::debug!(agent_id = record.agent_id(), status, "registered");

        Ok(body)
    }

    /// Fetch one page of lookup results.
    ///
    /// Note the `blocking_` prefix. This is a hint to the caller that if the
    /// function is used in an async context, it should be treated as a
    /// blocking operation.
    pub fn blocking_lookup(
        &self,
        query: &LookupQuery,
    ) -> AnsResult<LookupResult> {
        self.blocking_lookup_params(&query.to_pairs())
    }

    /// Fetch one page of lookup results for a raw parameter list.
    ///
    /// Each key and value is escaped independently and sent in the
    /// given order.
    ///
    /// Note the `blocking_` prefix. This is a hint to the caller that if the
    /// function is used in an async context, it should be treated as a
    /// blocking operation.
    pub fn blocking_lookup_params<K, V>(
        &self,
        params: &[(K, V)],
    ) -> AnsResult<LookupResult>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = self.endpoint("lookup");

        tracing::debug!(%url, param_count = params.len(), "looking up agents");

        let mut req = self.agent.get(url.as_str());
        for (k, v) in params {
            req = req.query(k.as_ref(), v.as_ref());
        }

        let (status, status_text, body) =
            read_response(req.call(), "looking up agents")?;

        if !(200..300).contains(&status) {
            tracing::warn!(status, %body, "lookup rejected");
            return Err(AnsError::lookup_rejected(status, &status_text, &body));
        }

        let out = LookupResult::decode(&body).inspect_err(|err| {
            tracing::warn!(?err, "failure decoding lookup response");
        })?;

        tracing::debug!(
            total_matches = out.total_matches,
            has_next_page = out.has_next_page(),
            "lookup complete"
        );

        Ok(out)
    }
}

/// Status, status text and body of a response, whatever its status.
fn read_response(
    res: Result<ureq::Response, ureq::Error>,
    ctx: &str,
) -> AnsResult<(u16, String, String)> {
    let resp = match res {
        Ok(resp) => resp,
        Err(ureq::Error::Status(_, resp)) => resp,
        Err(ureq::Error::Transport(err)) => {
            return Err(AnsError::transport(ctx, err));
        }
    };

    let status = resp.status();
    let status_text = resp.status_text().to_string();
    let body = read_body(resp.into_reader(), MAX_RESPONSE_BYTES, ctx)?;

    Ok((status, status_text, body))
}

/// Largest response body the client will read.
pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Read a response body of at most `limit` bytes.
///
/// A failing read is a transport error. A body that is too large or not
/// UTF-8 arrived intact, so it is a malformed response.
fn read_body(
    reader: impl std::io::Read,
    limit: usize,
    ctx: &str,
) -> AnsResult<String> {
    use std::io::Read;

    let mut buf = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .map_err(|e| {
            AnsError::transport(format!("{ctx}: reading response body"), e)
        })?;

    if buf.len() > limit {
        buf.truncate(limit);
        return Err(AnsError::malformed_response(
            &String::from_utf8_lossy(&buf),
            std::io::Error::other(format!(
                "response body exceeds {limit} bytes"
            )),
        ));
    }

    String::from_utf8(buf).map_err(|e| {
        let body = String::from_utf8_lossy(e.as_bytes()).into_owned();
        AnsError::malformed_response(&body, e)
    })
}

/// Submit a signed record to the registry at `server_url`, using a
/// default-configured client.
///
/// Note the `blocking_` prefix. This is a hint to the caller that if the
/// function is used in an async context, it should be treated as a
/// blocking operation.
pub fn blocking_register(
    server_url: &str,
    record: &AgentRecord,
) -> AnsResult<String> {
    RegistryClient::with_server_url(server_url)?.blocking_register(record)
}

/// Fetch one page of lookup results from the registry at `server_url`,
/// using a default-configured client.
///
/// Note the `blocking_` prefix. This is a hint to the caller that if the
/// function is used in an async context, it should be treated as a
/// blocking operation.
pub fn blocking_lookup(
    server_url: &str,
    query: &LookupQuery,
) -> AnsResult<LookupResult> {
    RegistryClient::with_server_url(server_url)?.blocking_lookup(query)
}
