//! Message types for rendered prompts.

use crate::Role;
use serde::{Deserialize, Serialize};

/// A rendered message in a provider conversation.
///
/// Messages are produced by rendering a profile's templates; by the time one
/// exists, every placeholder has been substituted.
///
/// # Examples
///
/// ```
/// use maestro_core::{Message, Role};
///
/// let message = Message {
///     role: Role::User,
///     content: "Generate the module.".to_string(),
/// };
///
/// assert_eq!(message.role, Role::User);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// The rendered text content
    pub content: String,
}

impl Message {
    /// Convenience constructor.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}
