//! An in-process ANS registry for tests.
//!
//! [TestRegistrySrv] speaks the same `POST /register` and `GET /lookup`
//! protocol as a real registry. It checks proofs of ownership with
//! `ans_core`, refuses duplicate agent ids and pages lookups by agent id.
//! It can also be told to answer every request with a canned response.

use ans_api::*;
use axum::extract::{Query, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{routing, Router};
use std::sync::{Arc, Mutex};

/// Page size used when a lookup does not give a valid `limit`.
pub const DEFAULT_LOOKUP_LIMIT: usize = 10;

/// Verification level assigned to newly registered agents.
pub const DEFAULT_TRUST_LEVEL: &str = "provisional";

struct StoredAgent {
    record: AgentRecord,
    did: String,
    level: String,
    assigned_at: Timestamp,
}

#[derive(Default)]
struct RegistryState {
    agents: Vec<StoredAgent>,
    forced: Option<(u16, String)>,
    queued: std::collections::VecDeque<(u16, String)>,
    register_calls: usize,
    lookup_calls: usize,
    last_register_body: Option<String>,
    last_register_content_type: Option<String>,
    last_lookup_query: Option<String>,
}

fn json_message(message: &str) -> String {
    serde_json::json!({ "success": false, "message": message }).to_string()
}

impl RegistryState {
    fn canned(&mut self) -> Option<(u16, String)> {
        self.queued.pop_front().or_else(|| self.forced.clone())
    }

    fn register(
        &mut self,
        content_type: Option<String>,
        body: String,
    ) -> (u16, String) {
        self.register_calls += 1;
        self.last_register_content_type = content_type;
        self.last_register_body = Some(body.clone());

        if let Some(canned) = self.canned() {
            return canned;
        }

        let record: AgentRecord = match serde_json::from_str(&body) {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(?err, "rejecting undecodable registration");
                return (400, json_message("invalid request body"));
            }
        };

        if record.agent_id().is_empty() {
            return (400, json_message("agent_id is required"));
        }

        match ans_core::verify_record(&record) {
            Ok(true) => (),
            Ok(false) => {
                return (401, json_message("Invalid proof"));
            }
            Err(AnsError::Unsigned { .. }) => {
                return (
                    400,
                    json_message("missing proof of ownership"),
                );
            }
            Err(err) => {
                tracing::debug!(?err, "rejecting unparsable public key");
                return (400, json_message("invalid public key"));
            }
        }

        if self
            .agents
            .iter()
            .any(|a| a.record.agent_id() == record.agent_id())
        {
            return (409, r#"{"error":"duplicate agent_id"}"#.to_string());
        }

        let did = format!("did:ans:{}", uuid::Uuid::new_v4());
        tracing::debug!(agent_id = record.agent_id(), %did, "registered");

        self.agents.push(StoredAgent {
            record,
            did,
            level: DEFAULT_TRUST_LEVEL.to_string(),
            assigned_at: Timestamp::now(),
        });

        (200, r#"{"status":"registered"}"#.to_string())
    }

    fn lookup(
        &mut self,
        raw_query: Option<String>,
        params: Vec<(String, String)>,
    ) -> (u16, String) {
        self.lookup_calls += 1;
        self.last_lookup_query = raw_query;

        if let Some(canned) = self.canned() {
            return canned;
        }

        let param = |key: &str| {
            params
                .iter()
                .find(|(k, v)| k == key && !v.is_empty())
                .map(|(_, v)| v.as_str())
        };

        let limit = param("limit")
            .and_then(|l| l.parse::<usize>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LOOKUP_LIMIT);

        let policy = match param("policy_requirements")
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
        {
            Ok(policy) => policy,
            Err(_) => {
                return (
                    400,
                    json_message("invalid policy_requirements"),
                );
            }
        };

        let capabilities: Vec<&str> = param("capabilities")
            .map(|c| {
                c.split(',').map(str::trim).filter(|c| !c.is_empty()).collect()
            })
            .unwrap_or_default();

        let matched: Vec<&StoredAgent> = self
            .agents
            .iter()
            .filter(|a| {
                param("agent_id")
                    .map(|id| a.record.agent_id() == id)
                    .unwrap_or(true)
            })
            .filter(|a| {
                param("query")
                    .map(|q| a.record.name().starts_with(q))
                    .unwrap_or(true)
            })
            .filter(|a| {
                param("trust_level")
                    .map(|level| a.level == level)
                    .unwrap_or(true)
            })
            .filter(|a| has_all(a.record.capabilities(), &capabilities))
            .collect();

        let start = match param("page_token") {
            None => 0,
            Some(token) => {
                match matched.iter().position(|a| a.record.agent_id() == token)
                {
                    Some(idx) => idx + 1,
                    None => {
                        return (
                            400,
                            json_message("invalid page_token"),
                        );
                    }
                }
            }
        };

        let end = (start + limit).min(matched.len());
        let page = &matched[start..end];

        let next_page_token = if end < matched.len() {
            page.last().map(|a| a.record.agent_id().to_string())
        } else {
            None
        };

        let results: Vec<AgentResult> = page
            .iter()
            .map(|a| to_result(a, policy.as_ref()))
            .collect();

        let out = LookupResult {
            status: "success".to_string(),
            total_matches: results.len() as u64,
            results,
            next_page_token,
        };

        match serde_json::to_string(&out) {
            Ok(body) => (200, body),
            Err(err) => (500, json_message(&err.to_string())),
        }
    }
}

fn has_all(have: &[String], want: &[&str]) -> bool {
    want.iter().all(|w| have.iter().any(|h| h == w))
}

fn to_result(
    agent: &StoredAgent,
    policy: Option<&serde_json::Value>,
) -> AgentResult {
    let r = &agent.record;

    let policy_compatibility = match policy {
        None => true,
        Some(policy) => {
            let level_ok = policy
                .get("verification_status")
                .and_then(|v| v.as_str())
                .map(|v| v == agent.level)
                .unwrap_or(true);
            let caps: Vec<&str> = policy
                .get("capabilities")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|c| c.as_str()).collect())
                .unwrap_or_default();
            level_ok && has_all(r.capabilities(), &caps)
        }
    };

    AgentResult {
        agent_id: r.agent_id().to_string(),
        did: agent.did.clone(),
        name: r.name().to_string(),
        description: r.description().to_string(),
        organization: r.organization().to_string(),
        public_key: r.public_key().to_string(),
        endpoints: r.endpoints().clone(),
        capabilities: r.capabilities().to_vec(),
        verification: Verification {
            level: agent.level.clone(),
            timestamp: Some(agent.assigned_at.to_iso8601()),
            blockchain_proof: None,
        },
        policy_compatibility,
    }
}

type SharedState = Arc<Mutex<RegistryState>>;

fn respond((status, body): (u16, String)) -> axum::response::Response {
    let status = StatusCode::from_u16(status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], body)
        .into_response()
}

async fn handle_register(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: String,
) -> axum::response::Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let out = state.lock().unwrap().register(content_type, body);
    respond(out)
}

async fn handle_lookup(
    State(state): State<SharedState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<Vec<(String, String)>>,
) -> axum::response::Response {
    let out = state.lock().unwrap().lookup(raw_query, params);
    respond(out)
}

struct Ready {
    addr: std::net::SocketAddr,
}

/// A test ANS registry, served on `127.0.0.1` from its own thread.
///
/// Constructing one is synchronous, so it can back blocking client
/// tests. Dropping it shuts the server down.
pub struct TestRegistrySrv {
    kill: Option<tokio::sync::oneshot::Sender<()>>,
    t_join: Option<std::thread::JoinHandle<()>>,
    addr: std::net::SocketAddr,
    state: SharedState,
}

impl Drop for TestRegistrySrv {
    fn drop(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
        if let Some(t_join) = self.t_join.take() {
            let _ = t_join.join();
        }
    }
}

impl TestRegistrySrv {
    /// Bind an ephemeral port and start serving.
    pub fn new() -> std::io::Result<Self> {
        let state = SharedState::default();

        let (s_ready, r_ready) = tokio::sync::oneshot::channel();
        let (kill, kill_r) = tokio::sync::oneshot::channel();

        let t_state = state.clone();
        let t_join = std::thread::spawn(move || {
            tokio_thread(t_state, s_ready, kill_r)
        });

        match r_ready.blocking_recv() {
            Ok(Ok(Ready { addr })) => Ok(Self {
                kill: Some(kill),
                t_join: Some(t_join),
                addr,
                state,
            }),
            Ok(Err(err)) => Err(err),
            Err(_) => {
                Err(std::io::Error::other("failed to bind test registry"))
            }
        }
    }

    /// The bound socket address.
    pub fn addr(&self) -> std::net::SocketAddr {
        self.addr
    }

    /// Base url of the registry, e.g. `http://127.0.0.1:40123`.
    pub fn url(&self) -> String {
        format!("http://{:?}", self.addr)
    }

    /// Answer every subsequent request with this status and body, once
    /// any queued responses are used up.
    pub fn force_response(&self, status: u16, body: impl Into<String>) {
        self.state.lock().unwrap().forced = Some((status, body.into()));
    }

    /// Answer the next request with this status and body. Queued
    /// responses are used in order, ahead of any forced response.
    pub fn queue_response(&self, status: u16, body: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .queued
            .push_back((status, body.into()));
    }

    /// Go back to normal request handling, dropping any queued
    /// responses.
    pub fn clear_forced_response(&self) {
        let mut lock = self.state.lock().unwrap();
        lock.forced = None;
        lock.queued.clear();
    }

    /// Change the verification level of a registered agent.
    /// Returns `false` if the agent is unknown.
    pub fn set_trust_level(&self, agent_id: &str, level: &str) -> bool {
        let mut lock = self.state.lock().unwrap();
        match lock
            .agents
            .iter_mut()
            .find(|a| a.record.agent_id() == agent_id)
        {
            Some(agent) => {
                agent.level = level.to_string();
                true
            }
            None => false,
        }
    }

    /// Records accepted so far, in registration order.
    pub fn registered(&self) -> Vec<AgentRecord> {
        self.state
            .lock()
            .unwrap()
            .agents
            .iter()
            .map(|a| a.record.clone())
            .collect()
    }

    /// Number of `/register` requests received.
    pub fn register_calls(&self) -> usize {
        self.state.lock().unwrap().register_calls
    }

    /// Number of `/lookup` requests received.
    pub fn lookup_calls(&self) -> usize {
        self.state.lock().unwrap().lookup_calls
    }

    /// Raw body of the most recent `/register` request.
    pub fn last_register_body(&self) -> Option<String> {
        self.state.lock().unwrap().last_register_body.clone()
    }

    /// Content type header of the most recent `/register` request.
    pub fn last_register_content_type(&self) -> Option<String> {
        self.state.lock().unwrap().last_register_content_type.clone()
    }

    /// Raw (still percent encoded) query string of the most recent
    /// `/lookup` request.
    pub fn last_lookup_query(&self) -> Option<String> {
        self.state.lock().unwrap().last_lookup_query.clone()
    }
}

fn tokio_thread(
    state: SharedState,
    ready: tokio::sync::oneshot::Sender<std::io::Result<Ready>>,
    kill_r: tokio::sync::oneshot::Receiver<()>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };

    rt.block_on(async move {
        let app: Router = Router::new()
            .route("/register", routing::post(handle_register))
            .route("/lookup", routing::get(handle_lookup))
            .with_state(state);

        let listener = match tokio::net::TcpListener::bind(
            std::net::SocketAddr::from(([127, 0, 0, 1], 0)),
        )
        .await
        {
            Ok(listener) => listener,
            Err(err) => {
                let _ = ready.send(Err(err));
                return;
            }
        };

        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(err) => {
                let _ = ready.send(Err(err));
                return;
            }
        };

        tracing::debug!(%addr, "test registry listening");

        if ready.send(Ok(Ready { addr })).is_err() {
            return;
        }

        let kill_r = async move {
            let _ = kill_r.await;
        };

        if let Err(err) = axum::serve(listener, app)
            .with_graceful_shutdown(kill_r)
            .await
        {
            tracing::warn!(?err, "test registry stopped");
        }
    });
}
