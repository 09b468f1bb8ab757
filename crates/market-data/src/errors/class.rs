/// Classification of an upstream failure.
///
/// Every [`UpstreamError`](super::UpstreamError) maps to exactly one class.
/// The proxy uses the class to word fallback warnings and to pick the status
/// code when no fallback source is available.
///
/// | Class | Meaning | Status without fallback |
/// |-------|---------|-------------------------|
/// | `Throttled` | Upstream quota or frequency limit hit | 429 + `Retry-After` |
/// | `Rejected` | Upstream error marker or non-OK HTTP status | 502 |
/// | `Malformed` | Body was not JSON | 502 |
/// | `Timeout` | Call exceeded its time budget | 504 |
/// | `Transport` | Network failure before a response arrived | 502 |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FailureClass {
    Throttled,
    Rejected,
    Malformed,
    Timeout,
    Transport,
}

impl FailureClass {
    /// Short human-readable reason, used in fallback warnings.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Throttled => "upstream rate limit reached",
            Self::Rejected => "upstream returned an error",
            Self::Malformed => "upstream returned an unreadable response",
            Self::Timeout => "upstream request timed out",
            Self::Transport => "upstream is unreachable",
        }
    }
}
