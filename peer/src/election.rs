//! Deterministic host election over the presence member set.

use shared::Member;

/// Derives the single authoritative peer from the current member set: the
/// member with the lexicographically smallest id, or `None` for an empty
/// room.
///
/// Both peers compute this independently from the same presence snapshot, so
/// no negotiation messages are needed. It is re-run on every join and leave;
/// when the host leaves, the surviving peer promotes itself.
pub fn elect_host<'a, I>(members: I) -> Option<&'a Member>
where
    I: IntoIterator<Item = &'a Member>,
{
    members.into_iter().min_by(|a, b| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_has_no_host() {
        let members: Vec<Member> = Vec::new();
        assert_eq!(elect_host(&members), None);
    }

    #[test]
    fn test_single_member_is_host() {
        let members = [Member::new("z9", "Solo")];
        assert_eq!(elect_host(&members), Some(&members[0]));
    }

    #[test]
    fn test_smallest_id_wins() {
        let a = Member::new("a1", "Alice");
        let b = Member::new("b2", "Bob");
        assert_eq!(elect_host([&a, &b]), Some(&a));
    }

    #[test]
    fn test_stable_under_reordering() {
        let a = Member::new("a1", "Alice");
        let b = Member::new("b2", "Bob");

        let forward = elect_host([&a, &b]).map(|m| m.id.clone());
        let reversed = elect_host([&b, &a]).map(|m| m.id.clone());
        assert_eq!(forward, reversed);
        assert_eq!(forward.as_deref(), Some("a1"));
    }

    #[test]
    fn test_ordering_is_lexicographic_not_numeric() {
        let ten = Member::new("peer-10", "Ten");
        let two = Member::new("peer-2", "Two");
        // "peer-10" < "peer-2" lexicographically.
        assert_eq!(elect_host([&two, &ten]), Some(&ten));
    }
}
