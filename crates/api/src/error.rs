//! ANS error types.

use std::sync::Arc;

/// A clonable trait-object inner error.
#[derive(Clone, Default)]
pub struct DynInnerError(
    pub Option<Arc<dyn std::error::Error + 'static + Send + Sync>>,
);

impl std::fmt::Debug for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            None => f.write_str("None"),
            Some(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for DynInnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.as_ref().map(|s| {
            let out: &(dyn std::error::Error + 'static) = &**s;
            out
        })
    }
}

impl DynInnerError {
    /// Construct a new DynInnerError from a source error.
    pub fn new<E: std::error::Error + 'static + Send + Sync>(e: E) -> Self {
        Self(Some(Arc::new(e)))
    }
}

/// The ANS error type, shared by key management, signing and the
/// registry client.
///
/// Every variant carries enough context to diagnose the failure without
/// re-querying the registry. Rejections keep the registry's status line
/// and body verbatim, since that body is the registry's only channel for
/// explaining itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnsError {
    /// The crypto provider cannot supply the required curve or randomness.
    #[error("crypto unavailable: {ctx} (src: {src})")]
    CryptoUnavailable {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// The key was rejected while producing a signature.
    #[error("signing failed: {ctx} (src: {src})")]
    SigningFailed {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// Key material could not be decoded.
    #[error("invalid key: {ctx} (src: {src})")]
    InvalidKey {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// A record without a proof of ownership was handed to the
    /// registration client.
    #[error("record {agent_id:?} has no proof of ownership")]
    Unsigned {
        /// The agent id of the offending record.
        agent_id: Arc<str>,
    },

    /// The registry could not be reached.
    #[error("transport error: {ctx} (src: {src})")]
    Transport {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// The registry answered a registration with a non-success status.
    #[error("registration rejected: {status} {status_text}: {body}")]
    RegistrationRejected {
        /// The http status code.
        status: u16,

        /// The http status text.
        status_text: Arc<str>,

        /// The raw response body.
        body: Arc<str>,
    },

    /// The registry answered a lookup with a non-success status.
    #[error("lookup rejected: {status} {status_text}: {body}")]
    LookupRejected {
        /// The http status code.
        status: u16,

        /// The http status text.
        status_text: Arc<str>,

        /// The raw response body.
        body: Arc<str>,
    },

    /// A response body did not have the expected json shape.
    #[error("malformed response: {body} (src: {src})")]
    MalformedResponse {
        /// The raw response body.
        body: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// Reading or writing key material on disk failed.
    #[error("io error: {ctx} (src: {src})")]
    Io {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// Invalid client configuration.
    #[error("invalid config: {ctx}")]
    Config {
        /// Any context associated with this error.
        ctx: Arc<str>,
    },

    /// Generic internal error.
    #[error("{ctx} (src: {src})")]
    Other {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },
}

fn ctx_str<C: std::fmt::Display>(ctx: C) -> Arc<str> {
    ctx.to_string().into_boxed_str().into()
}

impl AnsError {
    /// Construct a "crypto unavailable" error with an inner source error.
    pub fn crypto_unavailable<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::CryptoUnavailable {
            ctx: ctx_str(ctx),
            src: DynInnerError::new(src),
        }
    }

    /// Construct a "signing failed" error with an inner source error.
    pub fn signing_failed<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::SigningFailed {
            ctx: ctx_str(ctx),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an "invalid key" error with an inner source error.
    pub fn invalid_key_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::InvalidKey {
            ctx: ctx_str(ctx),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an "invalid key" error.
    pub fn invalid_key<C: std::fmt::Display>(ctx: C) -> Self {
        Self::InvalidKey {
            ctx: ctx_str(ctx),
            src: DynInnerError::default(),
        }
    }

    /// Construct an "unsigned" error for the given agent id.
    pub fn unsigned(agent_id: &str) -> Self {
        Self::Unsigned {
            agent_id: agent_id.into(),
        }
    }

    /// Construct a transport error with an inner source error.
    pub fn transport<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Transport {
            ctx: ctx_str(ctx),
            src: DynInnerError::new(src),
        }
    }

    /// Construct a "registration rejected" error.
    pub fn registration_rejected(
        status: u16,
        status_text: &str,
        body: &str,
    ) -> Self {
        Self::RegistrationRejected {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// Construct a "lookup rejected" error.
    pub fn lookup_rejected(status: u16, status_text: &str, body: &str) -> Self {
        Self::LookupRejected {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// Construct a "malformed response" error with an inner source error.
    pub fn malformed_response<S: std::error::Error + 'static + Send + Sync>(
        body: &str,
        src: S,
    ) -> Self {
        Self::MalformedResponse {
            body: body.into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an io error with an inner source error.
    pub fn io<C: std::fmt::Display>(ctx: C, src: std::io::Error) -> Self {
        Self::Io {
            ctx: ctx_str(ctx),
            src: DynInnerError::new(src),
        }
    }

    /// Construct a configuration error.
    pub fn config<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Config { ctx: ctx_str(ctx) }
    }

    /// Construct an "other" error with an inner source error.
    pub fn other_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Other {
            ctx: ctx_str(ctx),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an "other" error.
    pub fn other<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Other {
            ctx: ctx_str(ctx),
            src: DynInnerError::default(),
        }
    }

    /// The http status code, if this error is a registry rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RegistrationRejected { status, .. }
            | Self::LookupRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The raw response body, if this error carries one.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::RegistrationRejected { body, .. }
            | Self::LookupRejected { body, .. }
            | Self::MalformedResponse { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// The ANS result type.
pub type AnsResult<T> = Result<T, AnsError>;
