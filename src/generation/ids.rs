use std::collections::HashSet;

use uuid::Uuid;

/// Assigns ids to the items of a freshly generated list.
///
/// An item keeps the id it claims only when that id belongs to `previous`
/// and no earlier item in the same list already claimed it. Every other item
/// gets a new v4 id that is absent from `previous`. The result is always
/// free of duplicates.
pub fn reconcile_ids<'a>(
    claimed: impl IntoIterator<Item = Option<&'a str>>,
    previous: &[Uuid],
) -> Vec<Uuid> {
    let known: HashSet<Uuid> = previous.iter().copied().collect();
    let mut used = HashSet::new();

    claimed
        .into_iter()
        .map(|claim| {
            let kept = claim
                .and_then(|s| Uuid::parse_str(s.trim()).ok())
                .filter(|id| known.contains(id) && !used.contains(id));
            let id = kept.unwrap_or_else(|| loop {
                let fresh = Uuid::new_v4();
                if !known.contains(&fresh) && !used.contains(&fresh) {
                    break fresh;
                }
            });
            used.insert(id);
            id
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_generation_gets_fresh_unique_ids() {
        let ids = reconcile_ids([None, None, None], &[]);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn claimed_previous_ids_are_kept() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let a_str = a.to_string();
        let b_str = b.to_string();
        let ids = reconcile_ids([Some(a_str.as_str()), Some(b_str.as_str())], &[a, b]);
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn duplicate_claims_only_keep_the_first() {
        let a = Uuid::new_v4();
        let a_str = a.to_string();
        let ids = reconcile_ids([Some(a_str.as_str()), Some(a_str.as_str())], &[a]);
        assert_eq!(ids[0], a);
        assert_ne!(ids[1], a);
    }

    #[test]
    fn unknown_or_malformed_claims_get_new_ids() {
        let a = Uuid::new_v4();
        let stranger = Uuid::new_v4().to_string();
        let ids = reconcile_ids([Some(stranger.as_str()), Some("module-2")], &[a]);
        assert!(ids.iter().all(|id| *id != a));
        assert_ne!(ids[0].to_string(), stranger);
    }
}
