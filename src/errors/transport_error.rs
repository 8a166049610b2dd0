use thiserror::Error;

/// Failure below the HTTP layer: no status line was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("proxy error: {0}")]
    Proxy(String),
    #[error("connection error: {0}")]
    Connect(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("request failed: {0}")]
    Other(String),
}

impl TransportFailure {
    pub fn label(&self) -> &'static str {
        match self {
            TransportFailure::Proxy(_) => "proxy_error",
            TransportFailure::Connect(_) => "connect_error",
            TransportFailure::Timeout(_) => "timeout",
            TransportFailure::Other(_) => "transport_error",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            TransportFailure::Proxy(detail)
            | TransportFailure::Connect(detail)
            | TransportFailure::Timeout(detail)
            | TransportFailure::Other(detail) => detail,
        }
    }

    /// Replaces every occurrence of `raw` (typically the credentialed URL
    /// that reqwest echoes) with `shown`.
    pub fn scrub(self, raw: &str, shown: &str) -> Self {
        if raw.is_empty() {
            return self;
        }
        let clean = |detail: String| detail.replace(raw, shown);
        match self {
            TransportFailure::Proxy(detail) => TransportFailure::Proxy(clean(detail)),
            TransportFailure::Connect(detail) => TransportFailure::Connect(clean(detail)),
            TransportFailure::Timeout(detail) => TransportFailure::Timeout(clean(detail)),
            TransportFailure::Other(detail) => TransportFailure::Other(clean(detail)),
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let mut sources = Vec::new();
        let mut source = std::error::Error::source(err);
        while let Some(inner) = source {
            sources.push(inner.to_string());
            source = std::error::Error::source(inner);
        }
        Self::classify(err.is_timeout(), err.is_connect(), &err.to_string(), &sources)
    }

    /// Only the source chain is searched for proxy markers: the top-level
    /// message carries the request URL, whose host or path may say "proxy".
    pub fn classify(is_timeout: bool, is_connect: bool, message: &str, sources: &[String]) -> Self {
        let detail = std::iter::once(message.to_string())
            .chain(sources.iter().cloned())
            .collect::<Vec<_>>()
            .join(": ");
        if is_timeout {
            return TransportFailure::Timeout(detail);
        }
        let proxy_related = sources.iter().any(|text| {
            let lowered = text.to_lowercase();
            PROXY_MARKERS.iter().any(|marker| lowered.contains(marker))
        });
        if proxy_related {
            return TransportFailure::Proxy(detail);
        }
        if is_connect {
            return TransportFailure::Connect(detail);
        }
        TransportFailure::Other(detail)
    }
}

const PROXY_MARKERS: &[&str] = &["proxy", "tunnel"];
