use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a pairwise relationship. `Accepted` and `Blocked` are
/// terminal: there is no unfriend/unblock transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Blocked,
}

impl FriendshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FriendshipStatus::Pending),
            "accepted" => Some(FriendshipStatus::Accepted),
            "blocked" => Some(FriendshipStatus::Blocked),
            _ => None,
        }
    }

    /// A request starts at `Pending`; the only legal moves from there are
    /// acceptance or blocking.
    pub fn can_transition_to(self, next: FriendshipStatus) -> bool {
        matches!(
            (self, next),
            (FriendshipStatus::Pending, FriendshipStatus::Accepted)
                | (FriendshipStatus::Pending, FriendshipStatus::Blocked)
        )
    }
}

/// Order a pair of user ids canonically (byte comparison, smaller first).
///
/// Friendship rows are keyed on the normalized pair so (A, B) and (B, A)
/// always resolve to the same row. Who actually sent the request is kept
/// in a separate initiator column, never in the key order.
pub fn normalize_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a.as_bytes() <= b.as_bytes() { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_symmetric() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(normalize_pair(a, b), normalize_pair(b, a));
    }

    #[test]
    fn normalize_is_idempotent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (low, high) = normalize_pair(a, b);
        assert_eq!(normalize_pair(low, high), (low, high));
        assert!(low.as_bytes() <= high.as_bytes());
    }

    #[test]
    fn normalize_self_pair() {
        let a = Uuid::new_v4();
        assert_eq!(normalize_pair(a, a), (a, a));
    }

    #[test]
    fn pending_can_become_accepted_or_blocked() {
        assert!(FriendshipStatus::Pending.can_transition_to(FriendshipStatus::Accepted));
        assert!(FriendshipStatus::Pending.can_transition_to(FriendshipStatus::Blocked));
    }

    #[test]
    fn accepted_and_blocked_are_terminal() {
        for terminal in [FriendshipStatus::Accepted, FriendshipStatus::Blocked] {
            for next in [
                FriendshipStatus::Pending,
                FriendshipStatus::Accepted,
                FriendshipStatus::Blocked,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            FriendshipStatus::Pending,
            FriendshipStatus::Accepted,
            FriendshipStatus::Blocked,
        ] {
            assert_eq!(FriendshipStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FriendshipStatus::parse("unfriended"), None);
    }
}
