/// The lifecycle transition table
///
/// Single source of truth for which (status, action, role) combinations
/// are allowed. Everything not listed here is rejected.
use super::models::{PaperAction, PaperStatus, Role};

/// One row of the transition table
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub from: PaperStatus,
    pub action: PaperAction,
    pub to: PaperStatus,
    pub roles: &'static [Role],
    /// A lecturer performing this action must own the paper
    pub owner_only: bool,
}

/// Every defined transition. `moderate` lands in `Moderated`; the
/// payload's forward flag may short-circuit to `PendingApproval`
/// (still one signature).
pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: PaperStatus::Draft,
        action: PaperAction::Submit,
        to: PaperStatus::PendingModeration,
        roles: &[Role::Lecturer],
        owner_only: true,
    },
    TransitionRule {
        from: PaperStatus::RevisionRequired,
        action: PaperAction::Submit,
        to: PaperStatus::PendingModeration,
        roles: &[Role::Lecturer],
        owner_only: true,
    },
    TransitionRule {
        from: PaperStatus::PendingModeration,
        action: PaperAction::RequestRevision,
        to: PaperStatus::RevisionRequired,
        roles: &[Role::Examiner],
        owner_only: false,
    },
    TransitionRule {
        from: PaperStatus::PendingModeration,
        action: PaperAction::Moderate,
        to: PaperStatus::Moderated,
        roles: &[Role::Examiner],
        owner_only: false,
    },
    TransitionRule {
        from: PaperStatus::Moderated,
        action: PaperAction::ForwardToHod,
        to: PaperStatus::PendingApproval,
        roles: &[Role::Examiner, Role::Lecturer],
        owner_only: true,
    },
    TransitionRule {
        from: PaperStatus::PendingApproval,
        action: PaperAction::Approve,
        to: PaperStatus::Approved,
        roles: &[Role::Hod],
        owner_only: false,
    },
    TransitionRule {
        from: PaperStatus::PendingApproval,
        action: PaperAction::Reject,
        to: PaperStatus::Rejected,
        roles: &[Role::Hod],
        owner_only: false,
    },
    TransitionRule {
        from: PaperStatus::Approved,
        action: PaperAction::SendToPrint,
        to: PaperStatus::Printed,
        roles: &[Role::Hod],
        owner_only: false,
    },
];

/// Whether any rule lets `role` perform `action`, from any state.
/// Checked before the state check so a disallowed role always gets
/// Forbidden rather than InvalidTransition.
pub fn role_may_perform(role: Role, action: PaperAction) -> bool {
    TRANSITIONS
        .iter()
        .any(|rule| rule.action == action && rule.roles.contains(&role))
}

/// Whether `action` is owner-only when performed by a lecturer, in any
/// state. Checked alongside the role check so a non-owner gets
/// Forbidden before the paper's status is even consulted.
pub fn action_requires_owner(action: PaperAction) -> bool {
    TRANSITIONS
        .iter()
        .any(|rule| rule.action == action && rule.owner_only)
}

/// Look up the rule for (current status, action), if one is defined
pub fn find_rule(from: PaperStatus, action: PaperAction) -> Option<&'static TransitionRule> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.action == action)
}
