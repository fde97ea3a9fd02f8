//! Pure types for request-scoped context.

use feedsync_core::feed::UserId;
use uuid::Uuid;

/// Header carrying the authenticated user id, set by the fronting gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Unique identifier for a request, used for tracing and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request-scoped context available to all handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request identifier for tracing.
    pub request_id: RequestId,
}

/// The authenticated caller. Rejects the request with 401 when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);
