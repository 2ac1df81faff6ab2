#[cfg(test)]
mod tests {
    use crate::api::{Actor, UserId};
    use crate::models::{BoardStatus, ItemStatus, Role, Visibility};
    use crate::services::policy::{
        board_accepts_item_writes, can_reopen, can_transition, can_view,
    };

    const ALL_STATUSES: [ItemStatus; 4] = [
        ItemStatus::Planned,
        ItemStatus::Todo,
        ItemStatus::InProgress,
        ItemStatus::Completed,
    ];

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::new(1), role)
    }

    #[test]
    fn test_public_content_visible_to_anyone() {
        for role in [Role::Admin, Role::Parent, Role::Student, Role::User] {
            assert!(can_view(&actor(role), Visibility::Public, false, false));
        }
    }

    #[test]
    fn test_private_content_owner_only() {
        let a = actor(Role::Parent);
        assert!(can_view(&a, Visibility::Private, true, false));
        assert!(!can_view(&a, Visibility::Private, false, false));
        // A collaborator grant does not open private content.
        assert!(!can_view(&a, Visibility::Private, false, true));
    }

    #[test]
    fn test_shared_content_extends_to_collaborators() {
        let a = actor(Role::Student);
        assert!(can_view(&a, Visibility::Shared, true, false));
        assert!(can_view(&a, Visibility::Shared, false, true));
        assert!(!can_view(&a, Visibility::Shared, false, false));
    }

    #[test]
    fn test_admin_bypasses_visibility() {
        let a = actor(Role::Admin);
        assert!(can_view(&a, Visibility::Private, false, false));
        assert!(can_view(&a, Visibility::Shared, false, false));
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(can_transition(ItemStatus::Planned, ItemStatus::Todo));
        assert!(can_transition(ItemStatus::Todo, ItemStatus::InProgress));
        assert!(can_transition(ItemStatus::InProgress, ItemStatus::Completed));
        // Skipping intermediate states is fine.
        assert!(can_transition(ItemStatus::Planned, ItemStatus::Completed));
        assert!(can_transition(ItemStatus::Todo, ItemStatus::Completed));
    }

    #[test]
    fn test_transition_matrix_is_strictly_forward() {
        // ALL_STATUSES lists the workflow in order, so "allowed" is exactly
        // "later in the array".
        for (i, from) in ALL_STATUSES.into_iter().enumerate() {
            for (j, to) in ALL_STATUSES.into_iter().enumerate() {
                assert_eq!(can_transition(from, to), j > i, "{from:?} -> {to:?}");
            }
        }
        assert!(!can_transition(ItemStatus::Completed, ItemStatus::InProgress));
        assert!(!can_transition(ItemStatus::InProgress, ItemStatus::Todo));
        assert!(!can_transition(ItemStatus::Todo, ItemStatus::Todo));
    }

    #[test]
    fn test_reopen_is_exactly_completed_to_in_progress() {
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                let expected =
                    from == ItemStatus::Completed && to == ItemStatus::InProgress;
                assert_eq!(can_reopen(from, to), expected, "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn test_archived_board_rejects_item_writes() {
        assert!(board_accepts_item_writes(BoardStatus::Active));
        assert!(!board_accepts_item_writes(BoardStatus::Archived));
    }
}
