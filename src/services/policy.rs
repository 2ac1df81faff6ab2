//! Visibility and workflow policy predicates.
//!
//! Pure functions over the policy inputs; they touch no storage. Repository
//! implementations call the workflow predicates inside their transactions,
//! and the service layer calls the visibility predicate before handing
//! content to a caller. Collaborator membership is resolved by the caller
//! (sharing grants live outside this crate) and passed in as a flag.

use crate::api::Actor;
use crate::models::{BoardStatus, ItemStatus, Visibility};

/// Whether `actor` may read content with the given visibility.
///
/// Admins see everything. `PUBLIC` is open, `PRIVATE` is owner-only, and
/// `SHARED` extends to collaborators.
pub fn can_view(
    actor: &Actor,
    visibility: Visibility,
    is_owner: bool,
    is_collaborator: bool,
) -> bool {
    if actor.is_admin() {
        return true;
    }
    match visibility {
        Visibility::Public => true,
        Visibility::Private => is_owner,
        Visibility::Shared => is_owner || is_collaborator,
    }
}

fn rank(status: ItemStatus) -> u8 {
    match status {
        ItemStatus::Planned => 0,
        ItemStatus::Todo => 1,
        ItemStatus::InProgress => 2,
        ItemStatus::Completed => 3,
    }
}

/// Whether an item may move from `from` to `to` through the ordinary status
/// operation.
///
/// Statuses advance strictly forward along
/// `PLANNED -> TODO -> IN_PROGRESS -> COMPLETED`; skipping intermediate
/// states is allowed, going backwards is not. `from == to` is not a
/// transition (callers treat it as an idempotent no-op before asking).
pub fn can_transition(from: ItemStatus, to: ItemStatus) -> bool {
    rank(to) > rank(from)
}

/// Whether the explicit reopen operation applies: only
/// `COMPLETED -> IN_PROGRESS`.
pub fn can_reopen(from: ItemStatus, to: ItemStatus) -> bool {
    from == ItemStatus::Completed && to == ItemStatus::InProgress
}

/// Whether a board in this state accepts item creation, mutation, or
/// reordering. Archived boards are read-only.
pub fn board_accepts_item_writes(status: BoardStatus) -> bool {
    status == BoardStatus::Active
}
