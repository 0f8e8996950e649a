//! Lifecycle effects.
//!
//! Effects are descriptions; services execute them in the order returned.

/// Side effects emitted by the lifecycle reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEffect {
    /// Issue a fresh one-time code and email it.
    IssueOtc,

    /// Record the review request and notify administrators.
    RequestHostReview,

    /// Tell the HOST it was approved.
    SendApprovalNotice,

    /// Tell the HOST it was rejected. Always precedes [`LifecycleEffect::DeleteIdentity`].
    SendRejectionNotice,

    /// Remove the identity record.
    DeleteIdentity,

    /// Sign and hand out a session credential.
    MintSession,
}
