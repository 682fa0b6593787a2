//! Membership handlers.
//!
//! Command and query handlers for the membership lifecycle:
//!
//! ## Commands
//! - Invitations: invite, accept, cancel, expiry sweep
//! - Memberships: deactivate, reactivate, delete, switch active workspace
//!
//! ## Queries
//! - List a user's workspaces
//! - List a tenant's members

mod accept_invitation;
mod cancel_invitation;
mod deactivate_member;
mod delete_membership;
mod expire_invitations;
mod invite_member;
mod queries;
mod reactivate_member;
mod switch_workspace;

// Commands
pub use accept_invitation::{
    AcceptInvitationCommand, AcceptInvitationHandler, AcceptInvitationResult,
};
pub use cancel_invitation::{
    CancelInvitationCommand, CancelInvitationHandler, CancelInvitationResult,
};
pub use deactivate_member::{
    DeactivateMemberCommand, DeactivateMemberHandler, DeactivateMemberResult,
};
pub use delete_membership::{
    DeleteMembershipCommand, DeleteMembershipHandler, DeleteMembershipResult,
};
pub use expire_invitations::{
    ExpireInvitationsCommand, ExpireInvitationsHandler, ExpireInvitationsResult,
};
pub use invite_member::{
    InvitationPolicy, InviteMemberCommand, InviteMemberHandler, InviteMemberResult,
};
pub use reactivate_member::{
    ReactivateMemberCommand, ReactivateMemberHandler, ReactivateMemberResult,
};
pub use switch_workspace::{
    SwitchWorkspaceCommand, SwitchWorkspaceHandler, SwitchWorkspaceResult,
};

// Queries
pub use queries::{
    ListTenantMembersHandler, ListTenantMembersQuery, ListTenantMembersResult,
    ListWorkspacesHandler, ListWorkspacesQuery, ListWorkspacesResult, WorkspaceEntry,
};
