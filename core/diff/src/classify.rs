//! The three-way classification combinator underlying both row merge and schema merge
//! (spec.md §4.6's eight-way classification — {unchanged, added-by-one, added-by-both,
//! modified-by-one, modified-by-both, deleted-by-one, deleted-by-both,
//! modified-here-deleted-there} — collapses to one rule once base/ours/theirs are each
//! `Option<T>`: agree and it's resolved, otherwise one side winning over an unmodified base
//! resolves to the other side's value, otherwise it's a conflict).

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The merge result for this key, `None` meaning "absent" (deleted or never existed).
    Resolved(Option<T>),
    Conflict,
}

/// Classifies one key's base/ours/theirs values per spec.md §4.6. `T` must be `PartialEq`
/// so "did this side change it" reduces to equality with `base`.
pub fn classify<T: Clone + PartialEq>(base: Option<&T>, ours: Option<&T>, theirs: Option<&T>) -> Outcome<T> {
    if ours == theirs {
        // unchanged, or changed identically on both sides (added-by-both /
        // modified-by-both with equal outcomes, or deleted-by-both).
        return Outcome::Resolved(ours.cloned());
    }
    if base == ours {
        // Only theirs changed it: added-by-one / modified-by-one / deleted-by-one.
        return Outcome::Resolved(theirs.cloned());
    }
    if base == theirs {
        // Only ours changed it.
        return Outcome::Resolved(ours.cloned());
    }
    // Both sides changed it, disagreeing: modified-by-both (different values),
    // modified-here-deleted-there, or deleted-here-modified-there.
    Outcome::Conflict
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_resolves_to_the_shared_value() {
        assert_eq!(classify(Some(&1), Some(&1), Some(&1)), Outcome::Resolved(Some(1)));
    }

    #[test]
    fn changed_on_one_side_only_takes_that_side() {
        assert_eq!(classify(Some(&1), Some(&1), Some(&2)), Outcome::Resolved(Some(2)));
        assert_eq!(classify(Some(&1), Some(&2), Some(&1)), Outcome::Resolved(Some(2)));
    }

    #[test]
    fn added_identically_by_both_is_resolved_not_a_conflict() {
        assert_eq!(classify(None, Some(&1), Some(&1)), Outcome::Resolved(Some(1)));
    }

    #[test]
    fn deleted_by_both_resolves_to_absent() {
        assert_eq!(classify(Some(&1), None, None), Outcome::Resolved(None));
    }

    #[test]
    fn modified_by_both_differently_is_a_conflict() {
        assert_eq!(classify(Some(&1), Some(&2), Some(&3)), Outcome::<i32>::Conflict);
    }

    #[test]
    fn modified_here_deleted_there_is_a_conflict() {
        assert_eq!(classify(Some(&1), Some(&2), None), Outcome::<i32>::Conflict);
        assert_eq!(classify(Some(&1), None, Some(&2)), Outcome::<i32>::Conflict);
    }
}
