//! Command line driver for the ANS client.
//!
//! `ans keygen` writes a fresh private key, `ans register` signs and submits
//! an agent record, and `ans lookup` queries the registry.

#![deny(missing_docs)]

use ans_api::*;
use ans_core::P256KeyPair;
use ans_registry_client::{RegistryClient, RegistryClientConfig};
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

/// Printed by `ans lookup` when the registry returns nothing.
pub const NO_MATCHES: &str = "No agents found matching the criteria.";

/// Command line arguments.
#[derive(clap::Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Base url of the registry. Required by `register` and `lookup`.
    #[arg(long, env = "ANS_SERVER_URL", global = true)]
    pub server_url: Option<String>,

    /// Request timeout in milliseconds.
    #[arg(long, default_value_t = 30_000, global = true)]
    pub timeout_ms: u32,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Generate a P-256 key pair. The private key is written to `--out`,
    /// the public key is printed.
    Keygen(KeygenArgs),

    /// Sign an agent record and submit it to the registry.
    Register(RegisterArgs),

    /// Query the registry.
    Lookup(LookupArgs),
}

/// Arguments for `ans keygen`.
#[derive(clap::Args, Debug)]
pub struct KeygenArgs {
    /// Where to write the unencrypted PKCS#8 private key PEM.
    #[arg(long)]
    pub out: PathBuf,
}

/// Arguments for `ans register`.
#[derive(clap::Args, Debug)]
pub struct RegisterArgs {
    /// Private key PEM written by `ans keygen`.
    #[arg(long)]
    pub key: PathBuf,

    /// Agent id, e.g. `my-smart-agent.ans`.
    #[arg(long)]
    pub agent_id: String,

    /// Display name.
    #[arg(long)]
    pub name: String,

    /// Free text description.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Owning organization.
    #[arg(long, default_value = "")]
    pub organization: String,

    /// Capability tag. May be repeated.
    #[arg(long = "capability")]
    pub capabilities: Vec<String>,

    /// Endpoint as `protocol=url`. May be repeated.
    #[arg(long = "endpoint", value_parser = parse_endpoint)]
    pub endpoints: Vec<(String, String)>,
}

/// Arguments for `ans lookup`.
#[derive(clap::Args, Debug)]
pub struct LookupArgs {
    /// Exact agent id.
    pub agent_id: Option<String>,

    /// Name prefix.
    #[arg(long)]
    pub query: Option<String>,

    /// Required capabilities, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub capabilities: Vec<String>,

    /// Verification level, e.g. `provisional`.
    #[arg(long)]
    pub trust_level: Option<String>,

    /// Page size.
    #[arg(long)]
    pub limit: Option<u32>,

    /// Json policy requirements.
    #[arg(long)]
    pub policy_requirements: Option<String>,

    /// Continue from this page token.
    #[arg(long)]
    pub page_token: Option<String>,

    /// Follow page tokens until the registry has no more results.
    #[arg(long)]
    pub all: bool,
}

impl LookupArgs {
    fn to_query(&self) -> LookupQuery {
        LookupQuery {
            agent_id: self.agent_id.clone(),
            query: self.query.clone(),
            capabilities: self
                .capabilities
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            trust_level: self.trust_level.clone(),
            limit: self.limit,
            policy_requirements: self.policy_requirements.clone(),
            page_token: self.page_token.clone(),
            extra: Vec::new(),
        }
    }
}

fn parse_endpoint(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((proto, url)) if !proto.is_empty() && !url.is_empty() => {
            Ok((proto.to_string(), url.to_string()))
        }
        _ => Err(format!("expected protocol=url, got {s:?}")),
    }
}

fn out_err(e: std::io::Error) -> AnsError {
    AnsError::io("writing output", e)
}

/// Execute a parsed command line, writing results to `out`.
pub fn run(args: Args, out: &mut impl Write) -> AnsResult<()> {
    let client = || {
        let server_url = args.server_url.clone().ok_or_else(|| {
            AnsError::config("--server-url or ANS_SERVER_URL is required")
        })?;
        RegistryClient::new(&RegistryClientConfig {
            server_url,
            timeout_ms: args.timeout_ms,
            ..Default::default()
        })
    };

    match &args.command {
        Command::Keygen(keygen) => run_keygen(keygen, out),
        Command::Register(register) => run_register(&client()?, register, out),
        Command::Lookup(lookup) => run_lookup(&client()?, lookup, out),
    }
}

fn run_keygen(args: &KeygenArgs, out: &mut impl Write) -> AnsResult<()> {
    let kp = P256KeyPair::generate()?;
    kp.write_private_key_pem(&args.out)?;

    tracing::info!(path = %args.out.display(), "wrote private key");

    out.write_all(kp.public_key_pem()?.as_bytes())
        .map_err(out_err)
}

fn run_register(
    client: &RegistryClient,
    args: &RegisterArgs,
    out: &mut impl Write,
) -> AnsResult<()> {
    let kp = P256KeyPair::read_private_key_pem(&args.key)?;

    let mut builder = AgentRecord::builder(args.agent_id.as_str())
        .name(args.name.as_str())
        .description(args.description.as_str())
        .organization(args.organization.as_str())
        .capabilities(args.capabilities.iter().cloned())
        .public_key(kp.public_key_pem()?);
    for (proto, url) in args.endpoints.iter() {
        builder = builder.endpoint(proto.as_str(), url.as_str());
    }

    let record = kp.sign_record(builder.build())?;
    let body = client.blocking_register(&record)?;

    writeln!(out, "{body}").map_err(out_err)
}

fn run_lookup(
    client: &RegistryClient,
    args: &LookupArgs,
    out: &mut impl Write,
) -> AnsResult<()> {
    let mut query = args.to_query();
    let mut results = Vec::new();
    let mut next: Option<String>;
    let mut seen_tokens: HashSet<String> =
        query.page_token.iter().cloned().collect();

    loop {
        let page = client.blocking_lookup(&query)?;
        results.extend(page.results.iter().cloned());
        next = page.next_page();

        if !args.all {
            break;
        }

        match next.take() {
            None => break,
            Some(token) => {
                if !seen_tokens.insert(token.clone()) {
                    return Err(AnsError::other(format!(
                        "registry repeated page token {token:?}"
                    )));
                }
                query = query.page_token(Some(token));
            }
        }
    }

    if results.is_empty() {
        return writeln!(out, "{NO_MATCHES}").map_err(out_err);
    }

    let pretty = serde_json::to_string_pretty(&results)
        .map_err(|e| AnsError::other_src("encoding results", e))?;
    writeln!(out, "{pretty}").map_err(out_err)?;

    if let Some(token) = next {
        writeln!(out, "Next page token: {token}").map_err(out_err)?;
    }

    Ok(())
}
