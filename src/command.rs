//! Per-request context passed alongside cart commands.

use serde::{Deserialize, Serialize};

/// Who is issuing a command and which request it belongs to.
///
/// Identity is owned by an external sign-in service; the cart only cares
/// whether a user is present at all. Both fields are recorded on the
/// tracing span of every executed command.
///
/// # Examples
///
/// ```
/// use cartfold::CommandContext;
///
/// let guest = CommandContext::default();
/// assert!(!guest.is_signed_in());
///
/// let ctx = CommandContext::default()
///     .with_actor("user-42")
///     .with_correlation_id("req-abc-123");
/// assert!(ctx.is_signed_in());
/// assert_eq!(ctx.correlation_id.as_deref(), Some("req-abc-123"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandContext {
    /// Signed-in user issuing the command, if any.
    pub actor: Option<String>,
    /// Correlation ID for tracing a request across views.
    pub correlation_id: Option<String>,
}

impl CommandContext {
    /// Set the signed-in user.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Set the correlation ID.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Whether a user is present.
    pub fn is_signed_in(&self) -> bool {
        self.actor.is_some()
    }
}
