// ==================== MEMBERSHIP MATCHER ====================
// Auto-enrollment rules are a table of (name, criteria) pairs evaluated by
// one generic match-and-enroll routine. A new auto-join dimension is a new
// row, not new control flow.

use serde::Serialize;

use crate::{
    models::{Club, ClubCriteria, ClubSummary, Membership, MembershipOrigin, User},
    services::club_directory,
    store::Store,
    utils::{now_millis, AppResult},
};

struct MatchRule {
    name: &'static str,
    criteria: fn(&User) -> Option<ClubCriteria>,
}

const MATCH_RULES: &[MatchRule] = &[
    MatchRule {
        name: "src",
        criteria: |_| Some(ClubCriteria::Src),
    },
    MatchRule {
        name: "faculty",
        criteria: |user| user.faculty_code.as_deref().map(ClubCriteria::faculty),
    },
    MatchRule {
        name: "department",
        criteria: |user| match (&user.faculty_code, &user.department_code) {
            (Some(faculty), Some(department)) => Some(ClubCriteria::department(faculty, department)),
            _ => None,
        },
    },
    MatchRule {
        name: "state",
        criteria: |user| user.state.as_deref().map(ClubCriteria::state),
    },
    MatchRule {
        name: "religion",
        criteria: |user| user.religion.as_deref().map(ClubCriteria::religion),
    },
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchOutcome {
    /// Every club the user belongs to by rule, in rule order.
    pub matched: Vec<ClubSummary>,
    /// Ids of clubs enrolled during this run; empty on a repeat run.
    pub newly_enrolled: Vec<String>,
}

impl MatchOutcome {
    pub fn message(&self) -> String {
        format!("matched with {} clubs", self.matched.len())
    }
}

/// Clubs the user must belong to, without enrolling anyone.
pub async fn matching_clubs(store: &dyn Store, user: &User) -> AppResult<Vec<Club>> {
    let mut clubs: Vec<Club> = Vec::with_capacity(MATCH_RULES.len());
    for rule in MATCH_RULES {
        let Some(criteria) = (rule.criteria)(user) else {
            continue;
        };
        match club_directory::find_by_criteria(store, &criteria).await? {
            Some(club) if !clubs.iter().any(|c| c.id == club.id) => clubs.push(club),
            Some(_) => {}
            None => log::debug!(
                "No {} club for {} ({}), skipping",
                rule.name,
                criteria.match_key(),
                user.id
            ),
        }
    }
    Ok(clubs)
}

/// Enrolls the user into every matched club. Safe to re-run, including after
/// a run that failed part way: each enrollment writes the membership and its
/// member count together, and an existing (user, club) pair is a no-op.
pub async fn match_and_enroll(store: &dyn Store, user: &User) -> AppResult<MatchOutcome> {
    let clubs = matching_clubs(store, user).await?;
    let now = now_millis();
    let mut newly_enrolled = Vec::new();

    for club in &clubs {
        let membership = Membership::new(&user.id, &club.id, MembershipOrigin::Auto, now);
        if store.enroll(&membership).await? {
            newly_enrolled.push(club.id.clone());
        } else {
            log::debug!("User {} already in club {}, skipping", user.id, club.id);
        }
    }

    log::info!(
        "🎯 User {} matched with {} clubs ({} new)",
        user.id,
        clubs.len(),
        newly_enrolled.len()
    );

    Ok(MatchOutcome {
        matched: clubs.iter().map(ClubSummary::from).collect(),
        newly_enrolled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClubType;
    use crate::store::{ClubStore, MembershipStore, MemoryStore};
    use crate::test_support::{seed_directory, user};
    use std::sync::Arc;

    async fn assert_counts_match_rows(store: &MemoryStore, user_id: &str) {
        for membership in store.list_memberships(user_id).await.unwrap() {
            let club = store.find_club(&membership.club_id).await.unwrap().unwrap();
            assert_eq!(club.member_count, 1, "{}", club.name);
        }
    }

    #[tokio::test]
    async fn test_reference_student_matches_five_clubs() {
        let store = MemoryStore::new();
        seed_directory(&store).await;

        let student = user("student-1", Some("SC"), Some("CS"), Some("Gombe"), Some("ISLAM"));
        let outcome = match_and_enroll(&store, &student).await.unwrap();

        let types: Vec<ClubType> = outcome.matched.iter().map(|c| c.club_type).collect();
        assert_eq!(
            types,
            vec![
                ClubType::Src,
                ClubType::Faculty,
                ClubType::Department,
                ClubType::State,
                ClubType::Religion
            ]
        );
        assert_eq!(outcome.newly_enrolled.len(), 5);
        assert_eq!(outcome.message(), "matched with 5 clubs");

        let memberships = store.list_memberships(&student.id).await.unwrap();
        assert_eq!(memberships.len(), 5);
        assert!(memberships.iter().all(|m| m.origin == MembershipOrigin::Auto));
    }

    #[tokio::test]
    async fn test_matching_is_idempotent() {
        let store = MemoryStore::new();
        seed_directory(&store).await;
        let student = user("student-1", Some("SC"), Some("CS"), Some("gombe"), Some("Islam"));

        let first = match_and_enroll(&store, &student).await.unwrap();
        let second = match_and_enroll(&store, &student).await.unwrap();

        assert_eq!(first.matched, second.matched);
        assert!(second.newly_enrolled.is_empty());
        assert_eq!(store.list_memberships(&student.id).await.unwrap().len(), 5);
        for summary in &first.matched {
            let club = store.find_club(&summary.id).await.unwrap().unwrap();
            assert_eq!(club.member_count, 1, "{}", club.name);
        }
    }

    #[tokio::test]
    async fn test_retry_after_partial_failure_completes_enrollment() {
        let store = MemoryStore::new();
        let dir = seed_directory(&store).await;
        let student = user("student-1", Some("SC"), Some("CS"), Some("Gombe"), Some("ISLAM"));

        // src is enrolled, then the faculty enrollment fails
        store.fail_enrollments_into(Some(&dir.faculty.id));
        assert!(match_and_enroll(&store, &student).await.is_err());
        assert_eq!(store.list_memberships(&student.id).await.unwrap().len(), 1);
        assert_eq!(store.find_club(&dir.faculty.id).await.unwrap().unwrap().member_count, 0);

        store.fail_enrollments_into(None);
        let retry = match_and_enroll(&store, &student).await.unwrap();
        assert_eq!(retry.matched.len(), 5);
        assert_eq!(retry.newly_enrolled.len(), 4);
        assert!(!retry.newly_enrolled.contains(&dir.src.id));
        assert_eq!(store.list_memberships(&student.id).await.unwrap().len(), 5);
        assert_counts_match_rows(&store, &student.id).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_cannot_double_enroll() {
        let store = Arc::new(MemoryStore::new());
        seed_directory(&store).await;
        let student = user("student-1", Some("SC"), Some("CS"), Some("Gombe"), Some("ISLAM"));

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let store = store.clone();
                let student = student.clone();
                tokio::spawn(async move { match_and_enroll(store.as_ref(), &student).await.unwrap() })
            })
            .collect();

        let mut enrolled = 0;
        for handle in handles {
            let outcome = handle.await.unwrap();
            assert_eq!(outcome.matched.len(), 5);
            enrolled += outcome.newly_enrolled.len();
        }

        assert_eq!(enrolled, 5);
        assert_eq!(store.list_memberships(&student.id).await.unwrap().len(), 5);
        assert_counts_match_rows(&store, &student.id).await;
    }

    #[tokio::test]
    async fn test_unmatched_attributes_still_get_src() {
        let store = MemoryStore::new();
        seed_directory(&store).await;
        let student = user("student-2", None, None, Some("Lagos"), None);

        let outcome = match_and_enroll(&store, &student).await.unwrap();
        assert_eq!(outcome.matched.len(), 1);
        assert_eq!(outcome.matched[0].club_type, ClubType::Src);
    }

    #[tokio::test]
    async fn test_missing_clubs_are_omitted() {
        let store = MemoryStore::new();
        club_directory::ensure_src_club(&store, "SRC").await.unwrap();
        let student = user("student-3", Some("SC"), Some("CS"), Some("Gombe"), Some("ISLAM"));

        let outcome = match_and_enroll(&store, &student).await.unwrap();
        assert_eq!(outcome.matched.len(), 1);
    }

    #[tokio::test]
    async fn test_general_clubs_never_auto_matched() {
        let store = MemoryStore::new();
        let directory = seed_directory(&store).await;
        let student = user("student-4", Some("SC"), Some("CS"), Some("Gombe"), Some("ISLAM"));

        let clubs = matching_clubs(&store, &student).await.unwrap();
        assert!(clubs.iter().all(|c| c.club_type.is_auto_joined()));
        assert!(!clubs.iter().any(|c| c.id == directory.chess.id));
    }
}
