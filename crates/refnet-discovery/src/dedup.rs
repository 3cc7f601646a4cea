//! Network deduplication by provider place id.

use std::collections::HashMap;

use refnet_core::CandidateOffice;
use uuid::Uuid;

use crate::ports::NetworkMember;

/// Lookup of the user's network keyed by non-empty `place_id`.
///
/// Members without a place id are never matched; there is no name-based
/// fallback.
#[derive(Debug, Default, Clone)]
pub struct NetworkIndex {
    by_place_id: HashMap<String, Uuid>,
}

impl NetworkIndex {
    #[must_use]
    pub fn new(members: &[NetworkMember]) -> Self {
        let by_place_id = members
            .iter()
            .filter_map(|m| {
                let place_id = m.place_id.as_deref()?.trim();
                (!place_id.is_empty()).then(|| (place_id.to_string(), m.office_id))
            })
            .collect();
        Self { by_place_id }
    }

    /// The network office id for `place_id`, if tracked.
    #[must_use]
    pub fn office_for(&self, place_id: &str) -> Option<Uuid> {
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return None;
        }
        self.by_place_id.get(place_id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_place_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_place_id.is_empty()
    }
}

/// Sets `already_in_network` on every candidate from `index`, returning how
/// many matched. Flags are recomputed from scratch; no candidate is removed.
pub fn mark_network_members(offices: &mut [CandidateOffice], index: &NetworkIndex) -> usize {
    let mut matched = 0;
    for office in offices.iter_mut() {
        office.already_in_network = index.office_for(&office.place_id).is_some();
        if office.already_in_network {
            matched += 1;
        }
    }
    matched
}

/// Drops repeated place ids from a provider batch, keeping the first.
pub(crate) fn dedupe_by_place_id(offices: Vec<CandidateOffice>) -> Vec<CandidateOffice> {
    let mut seen = std::collections::HashSet::new();
    offices
        .into_iter()
        .filter(|o| {
            let id = o.place_id.trim();
            id.is_empty() || seen.insert(id.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{candidate, member};

    #[test]
    fn place_id_match_marks_already_in_network() {
        let mut offices = vec![
            candidate("ChIJabc", "Elite Dental"),
            candidate("ChIJnew", "Fresh Smiles"),
        ];
        let index = NetworkIndex::new(&[member(Some("ChIJabc"), "Elite Dental")]);

        let matched = mark_network_members(&mut offices, &index);

        assert_eq!(matched, 1);
        assert!(offices[0].already_in_network);
        assert!(!offices[1].already_in_network);
        assert_eq!(offices.len(), 2, "matched rows are kept");
    }

    #[test]
    fn similar_names_do_not_match() {
        let mut offices = vec![candidate("ChIJirvine", "Elite Dental Irvine")];
        let index = NetworkIndex::new(&[member(Some("ChIJother"), "Elite Dental")]);
        mark_network_members(&mut offices, &index);
        assert!(!offices[0].already_in_network);
    }

    #[test]
    fn members_without_place_id_never_match() {
        let mut offices = vec![candidate("", "Blank Id Dental")];
        let index = NetworkIndex::new(&[
            member(None, "Blank Id Dental"),
            member(Some("  "), "Blank Id Dental"),
        ]);
        assert!(index.is_empty());
        mark_network_members(&mut offices, &index);
        assert!(!offices[0].already_in_network);
    }

    #[test]
    fn stale_flags_are_cleared() {
        let mut office = candidate("ChIJgone", "Removed Dental");
        office.already_in_network = true;
        let mut offices = vec![office];
        mark_network_members(&mut offices, &NetworkIndex::default());
        assert!(!offices[0].already_in_network);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let first = candidate("ChIJdup", "First");
        let second = candidate("ChIJdup", "Second");
        let other = candidate("ChIJother", "Other");
        let kept = dedupe_by_place_id(vec![first, second, other]);
        let names: Vec<&str> = kept.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Other"]);
    }

    #[test]
    fn batch_dedupe_ignores_surrounding_whitespace() {
        let offices = vec![
            candidate(" ChIJa", "Elite Dental"),
            candidate("ChIJa", "Elite Dental"),
            candidate("ChIJb ", "Fresh Smiles"),
        ];

        let kept = dedupe_by_place_id(offices);

        let ids: Vec<_> = kept.iter().map(|o| o.place_id.as_str()).collect();
        assert_eq!(ids, vec![" ChIJa", "ChIJb "]);
    }
}
