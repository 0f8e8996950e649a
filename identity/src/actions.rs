//! Lifecycle actions.

use airena_core::Role;

/// Inputs to the lifecycle reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Create the identity.
    Register {
        /// Normalized email.
        email: String,
        /// Role asked for by the registrant.
        requested_role: Role,
    },

    /// The owner proved control of the email.
    VerifyEmail,

    /// An administrator approved the HOST.
    ApproveHost,

    /// An administrator rejected the HOST.
    RejectHost,

    /// A session credential is requested.
    IssueSession,
}
