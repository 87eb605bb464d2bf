//! Candidate acceptance filtering.

use std::collections::HashSet;

use crate::types::SlotDescriptor;

/// Accepted price and court categories.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AcceptanceSets {
    pub price_types: HashSet<String>,
    pub court_types: HashSet<String>,
}

impl AcceptanceSets {
    pub fn new<P, C, S>(price_types: P, court_types: C) -> Self
    where
        P: IntoIterator<Item = S>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            price_types: price_types.into_iter().map(Into::into).collect(),
            court_types: court_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a descriptor falls inside both accepted sets.
    pub fn matches(&self, descriptor: &SlotDescriptor) -> bool {
        self.price_types.contains(&descriptor.price_type)
            && self.court_types.contains(&descriptor.court_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(price: &str, court: &str) -> SlotDescriptor {
        SlotDescriptor {
            price_type: price.to_string(),
            court_type: court.to_string(),
        }
    }

    #[test]
    fn test_matches_when_both_accepted() {
        let sets = AcceptanceSets::new(["Adulte"], ["Court couvert"]);
        assert!(sets.matches(&descriptor("Adulte", "Court couvert")));
    }

    #[test]
    fn test_rejects_either_field_outside_set() {
        let sets = AcceptanceSets::new(["Adulte"], ["Court couvert"]);
        assert!(!sets.matches(&descriptor("Tarif réduit", "Court couvert")));
        assert!(!sets.matches(&descriptor("Adulte", "Court découvert")));
    }

    #[test]
    fn test_membership_ignores_order() {
        let a = AcceptanceSets::new(["Adulte", "Tarif réduit"], ["Court couvert", "Court découvert"]);
        let b = AcceptanceSets::new(["Tarif réduit", "Adulte"], ["Court découvert", "Court couvert"]);
        let d = descriptor("Tarif réduit", "Court découvert");
        assert_eq!(a.matches(&d), b.matches(&d));
        assert!(a.matches(&d));
    }

    #[test]
    fn test_empty_sets_accept_nothing() {
        let sets = AcceptanceSets::default();
        assert!(!sets.matches(&descriptor("Adulte", "Court couvert")));
    }
}
