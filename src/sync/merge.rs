//! Union-by-id merge of two snapshots.

use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    normalize_email, CollectionCounts, Identified, ShareGrant, Snapshot, UsageDay, User,
};

/// Result of merging a remote snapshot with the local one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub snapshot: Snapshot,
    /// Records the local store gains or sees changed, per collection.
    pub pulled: CollectionCounts,
    /// Local-only records the remote will gain, per collection.
    pub pushed: CollectionCounts,
    /// Local usage days dropped because the remote already holds another
    /// record for the same vehicle and date.
    pub conflicts: Vec<UsageDay>,
}

/// Merges per collection: every remote record, then every local record whose
/// id the remote does not have, in local order. On an id collision the remote
/// copy wins. `last_sync` is taken from the remote.
///
/// Two usage days for the same vehicle and date can only meet here when they
/// were logged offline on different devices; the first one in merged order is
/// kept and the rest are reported as conflicts. Duplicate grants for the same
/// code and user are collapsed.
///
/// Emails come out normalized, matching how the local store keeps them.
///
/// The function is pure: the same inputs always give the same output, and
/// merging the output with either input again changes nothing.
pub fn merge_snapshots(remote: &Snapshot, local: &Snapshot) -> MergeOutcome {
    let users = normalize_emails(union_by_id(&remote.users, &local.users));
    let vehicles = union_by_id(&remote.vehicles, &local.vehicles);
    let (usage_days, conflicts) = dedup_usage_days(union_by_id(&remote.usage_days, &local.usage_days));
    let share_grants = dedup_grants(union_by_id(&remote.share_grants, &local.share_grants));

    let pulled = CollectionCounts {
        users: count_pulled(&users, &local.users),
        vehicles: count_pulled(&vehicles, &local.vehicles),
        usage_days: count_pulled(&usage_days, &local.usage_days),
        share_grants: count_pulled(&share_grants, &local.share_grants),
    };
    let pushed = CollectionCounts {
        users: count_pushed(&users, &remote.users),
        vehicles: count_pushed(&vehicles, &remote.vehicles),
        usage_days: count_pushed(&usage_days, &remote.usage_days),
        share_grants: count_pushed(&share_grants, &remote.share_grants),
    };

    MergeOutcome {
        snapshot: Snapshot {
            users,
            vehicles,
            usage_days,
            share_grants,
            last_sync: remote.last_sync,
            version: remote.version.clone(),
        },
        pulled,
        pushed,
        conflicts,
    }
}

/// Remote records first, then local ones. An id is kept only at its first
/// occurrence, which also collapses repeated ids inside either side.
fn union_by_id<T: Identified + Clone>(remote: &[T], local: &[T]) -> Vec<T> {
    let mut seen: HashSet<Uuid> = HashSet::new();

    remote
        .iter()
        .chain(local.iter())
        .filter(|record| seen.insert(record.id()))
        .cloned()
        .collect()
}

fn normalize_emails(users: Vec<User>) -> Vec<User> {
    users
        .into_iter()
        .map(|mut user| {
            user.email = normalize_email(&user.email);
            user
        })
        .collect()
}

fn dedup_usage_days(days: Vec<UsageDay>) -> (Vec<UsageDay>, Vec<UsageDay>) {
    let mut seen: HashSet<(Uuid, NaiveDate)> = HashSet::new();
    days.into_iter()
        .partition(|day| seen.insert((day.vehicle_id, day.date)))
}

fn dedup_grants(grants: Vec<ShareGrant>) -> Vec<ShareGrant> {
    let mut seen: HashSet<(String, Uuid)> = HashSet::new();
    grants
        .into_iter()
        .filter(|grant| seen.insert((grant.share_code.to_uppercase(), grant.user_id)))
        .collect()
}

/// Merged records that are new to `local` or differ from the local copy.
fn count_pulled<T: Identified + PartialEq>(merged: &[T], local: &[T]) -> usize {
    merged
        .iter()
        .filter(|record| !local.iter().any(|l| l == *record))
        .count()
}

/// Merged records whose id the remote does not have yet.
fn count_pushed<T: Identified>(merged: &[T], remote: &[T]) -> usize {
    let remote_ids: HashSet<Uuid> = remote.iter().map(Identified::id).collect();
    merged
        .iter()
        .filter(|record| !remote_ids.contains(&record.id()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;
    use crate::models::Vehicle;

    fn user(name: &str) -> User {
        User::new(
            name,
            format!("{}@example.com", name.to_lowercase()),
            Credential::from_password("pw"),
        )
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
    }

    #[test]
    fn test_union_remote_wins_and_local_preserved() {
        let a = user("A");
        let b = user("B");
        let mut b_local = b.clone();
        b_local.name = "B edited offline".to_string();
        let c = user("C");

        let remote = Snapshot {
            users: vec![a.clone(), b.clone()],
            ..Snapshot::empty()
        };
        let local = Snapshot {
            users: vec![b_local, c.clone()],
            ..Snapshot::empty()
        };

        let outcome = merge_snapshots(&remote, &local);
        assert_eq!(outcome.snapshot.users, vec![a, b, c]);
        // A is new locally and B changed; C goes up.
        assert_eq!(outcome.pulled.users, 2);
        assert_eq!(outcome.pushed.users, 1);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let owner = user("Owner");
        let vehicle = Vehicle::new("Triumph TR6", "Triumph", "TR6", owner.id);
        let remote = Snapshot {
            users: vec![owner.clone()],
            vehicles: vec![vehicle.clone()],
            ..Snapshot::empty()
        };
        let local = Snapshot {
            users: vec![user("Local")],
            usage_days: vec![UsageDay::new(vehicle.id, owner.id, date(1), "Owner")],
            ..Snapshot::empty()
        };

        let first = merge_snapshots(&remote, &local);
        let again = merge_snapshots(&remote, &local);
        assert_eq!(first, again);

        // Merging the result again, from either side, changes nothing.
        let with_remote = merge_snapshots(&remote, &first.snapshot);
        assert_eq!(with_remote.snapshot, first.snapshot);
        let with_self = merge_snapshots(&first.snapshot, &first.snapshot);
        assert_eq!(with_self.snapshot, first.snapshot);
        assert_eq!(with_self.pulled.total(), 0);
        assert_eq!(with_self.pushed.total(), 0);
    }

    #[test]
    fn test_same_day_from_two_devices_is_a_conflict() {
        let vehicle_id = Uuid::new_v4();
        let theirs = UsageDay::new(vehicle_id, Uuid::new_v4(), date(5), "Ana");
        let mine = UsageDay::new(vehicle_id, Uuid::new_v4(), date(5), "Bo");
        let other_day = UsageDay::new(vehicle_id, Uuid::new_v4(), date(6), "Bo");

        let remote = Snapshot {
            usage_days: vec![theirs.clone()],
            ..Snapshot::empty()
        };
        let local = Snapshot {
            usage_days: vec![mine.clone(), other_day.clone()],
            ..Snapshot::empty()
        };

        let outcome = merge_snapshots(&remote, &local);
        assert_eq!(outcome.snapshot.usage_days, vec![theirs, other_day]);
        assert_eq!(outcome.conflicts, vec![mine]);
        assert_eq!(outcome.pushed.usage_days, 1);
    }

    #[test]
    fn test_duplicate_grants_collapse() {
        let vehicle_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let remote_grant = ShareGrant::new(vehicle_id, user_id, "AB12CD34");
        let local_grant = ShareGrant::new(vehicle_id, user_id, "ab12cd34");

        let outcome = merge_snapshots(
            &Snapshot {
                share_grants: vec![remote_grant.clone()],
                ..Snapshot::empty()
            },
            &Snapshot {
                share_grants: vec![local_grant],
                ..Snapshot::empty()
            },
        );
        assert_eq!(outcome.snapshot.share_grants, vec![remote_grant]);
    }

    #[test]
    fn test_empty_remote_keeps_local() {
        let local = Snapshot {
            users: vec![user("A"), user("B")],
            ..Snapshot::empty()
        };

        let outcome = merge_snapshots(&Snapshot::empty(), &local);
        assert_eq!(outcome.snapshot.users, local.users);
        assert_eq!(outcome.pulled.total(), 0);
        assert_eq!(outcome.pushed.users, 2);
    }

    #[test]
    fn test_repeated_remote_id_is_kept_once() {
        let a = user("A");
        let mut a_later = a.clone();
        a_later.name = "A renamed".to_string();
        let vehicle = Vehicle::new("Mini", "Austin", "Cooper", a.id);

        let remote = Snapshot {
            users: vec![a.clone(), a_later],
            vehicles: vec![vehicle.clone(), vehicle.clone()],
            ..Snapshot::empty()
        };
        let local = Snapshot {
            users: vec![a.clone()],
            ..Snapshot::empty()
        };

        let outcome = merge_snapshots(&remote, &local);
        assert_eq!(outcome.snapshot.users, vec![a]);
        assert_eq!(outcome.snapshot.vehicles, vec![vehicle]);
        assert_eq!(outcome.pulled.users, 0);
    }

    #[test]
    fn test_merged_emails_are_normalized() {
        let mut ana = user("Ana");
        ana.email = " Ana@Example.com".to_string();
        let remote = Snapshot {
            users: vec![ana.clone()],
            ..Snapshot::empty()
        };

        let outcome = merge_snapshots(&remote, &Snapshot::empty());
        assert_eq!(outcome.snapshot.users[0].email, "ana@example.com");

        // Once stored locally the record no longer counts as pulled.
        let again = merge_snapshots(&remote, &outcome.snapshot);
        assert_eq!(again.pulled.users, 0);
    }
}
