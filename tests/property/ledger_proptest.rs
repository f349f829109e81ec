//! Property-based tests for the optimistic mutation ledger

use cardkeep::client::membership::{PendingKind, PendingMutations};
use cardkeep::shared::{CardId, MembershipRecord, MembershipSet};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn snapshot() -> impl Strategy<Value = Vec<MembershipRecord>> {
    prop::collection::btree_set(0i64..20, 0..10).prop_map(|ids| {
        ids.into_iter()
            .map(|id| MembershipRecord::new(MembershipSet::Wishlist, CardId(id), None))
            .collect()
    })
}

fn card_ids(records: &[MembershipRecord]) -> BTreeSet<CardId> {
    records.iter().map(|r| r.card_id).collect()
}

proptest! {
    #[test]
    fn test_add_then_revert_restores_membership(records in snapshot(), card in 0i64..20) {
        let card = CardId(card);
        let before = card_ids(&records);
        let mut records = records;

        let mut ledger = PendingMutations::new();
        let inserted = !before.contains(&card);
        if inserted {
            records.push(MembershipRecord::new(MembershipSet::Wishlist, card, None));
        }
        let id = ledger.begin(MembershipSet::Wishlist, card, PendingKind::Add { inserted });

        let mutation = ledger.rollback(&id).unwrap();
        mutation.revert(&mut records);
        prop_assert_eq!(card_ids(&records), before);
    }

    #[test]
    fn test_remove_then_revert_restores_membership(records in snapshot(), card in 0i64..20) {
        let card = CardId(card);
        let before = card_ids(&records);
        let (removed, mut kept): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| r.card_id == card);

        let mut ledger = PendingMutations::new();
        let id = ledger.begin(MembershipSet::Wishlist, card, PendingKind::Remove { removed });

        let mutation = ledger.rollback(&id).unwrap();
        mutation.revert(&mut kept);
        prop_assert_eq!(card_ids(&kept), before);
    }

    #[test]
    fn test_replay_is_idempotent(records in snapshot(), adds in prop::collection::vec(0i64..20, 0..5), removes in prop::collection::vec(0i64..20, 0..5)) {
        let mut ledger = PendingMutations::new();
        for card in adds {
            ledger.begin(MembershipSet::Wishlist, CardId(card), PendingKind::Add { inserted: true });
        }
        for card in removes {
            ledger.begin(MembershipSet::Wishlist, CardId(card), PendingKind::Remove { removed: Vec::new() });
        }

        let mut once = records.clone();
        for mutation in ledger.for_set(MembershipSet::Wishlist) {
            mutation.replay(&mut once);
        }
        let mut twice = once.clone();
        for mutation in ledger.for_set(MembershipSet::Wishlist) {
            mutation.replay(&mut twice);
        }
        prop_assert_eq!(once, twice);
    }
}
