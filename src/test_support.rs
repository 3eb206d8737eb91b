//! Fixtures shared by the unit tests.

use crate::models::{Actor, Club, CreateClubRequest, Role, User};
use crate::services::club_directory;
use crate::store::{MemoryStore, UserStore};

pub struct Directory {
    pub src: Club,
    pub faculty: Club,
    pub department: Club,
    pub state: Club,
    pub religion: Club,
    pub chess: Club,
    pub drama: Club,
}

pub fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin)
}

pub fn student(id: &str) -> Actor {
    Actor::new(id, Role::Student)
}

async fn club(store: &MemoryStore, req: CreateClubRequest) -> Club {
    club_directory::create_club(store, &admin(), &req).await.unwrap()
}

/// src, Science (SC), Computer Science (SC/CS), Gombe, ISLAM, plus two general
/// clubs. Drama is a general club that charges dues.
pub async fn seed_directory(store: &MemoryStore) -> Directory {
    let src = club_directory::ensure_src_club(store, "SRC").await.unwrap();
    let faculty = club(
        store,
        CreateClubRequest {
            name: Some("Science".into()),
            club_type: Some("faculty".into()),
            faculty_code: Some("SC".into()),
            dues_applied: Some(true),
            dues_amount: Some(1500.0),
            ..Default::default()
        },
    )
    .await;
    let department = club(
        store,
        CreateClubRequest {
            name: Some("Computer Science".into()),
            club_type: Some("department".into()),
            faculty_code: Some("SC".into()),
            department_code: Some("CS".into()),
            ..Default::default()
        },
    )
    .await;
    let state = club(
        store,
        CreateClubRequest {
            name: Some("Gombe Students".into()),
            club_type: Some("state".into()),
            state: Some("Gombe".into()),
            ..Default::default()
        },
    )
    .await;
    let religion = club(
        store,
        CreateClubRequest {
            name: Some("MSSN".into()),
            club_type: Some("religion".into()),
            religion: Some("ISLAM".into()),
            ..Default::default()
        },
    )
    .await;
    let chess = club(
        store,
        CreateClubRequest {
            name: Some("Chess".into()),
            ..Default::default()
        },
    )
    .await;
    let drama = club(
        store,
        CreateClubRequest {
            name: Some("Drama".into()),
            club_type: Some("general".into()),
            dues_applied: Some(true),
            dues_amount: Some(500.0),
            ..Default::default()
        },
    )
    .await;

    Directory {
        src,
        faculty,
        department,
        state,
        religion,
        chess,
        drama,
    }
}

pub fn user(id: &str, faculty: Option<&str>, dept: Option<&str>, state: Option<&str>, religion: Option<&str>) -> User {
    User {
        id: id.to_string(),
        name: format!("Student {}", id),
        identifier: "UG20/SCCS/1026".to_string(),
        faculty_code: faculty.map(Into::into),
        department_code: dept.map(Into::into),
        state: state.map(Into::into),
        religion: religion.map(Into::into),
        role: Role::Student,
        created_at: 0,
    }
}

/// Stores a user record so authors resolve in rendered views.
pub async fn insert_user(store: &MemoryStore, id: &str, role: Role) -> User {
    let mut user = user(id, None, None, None, None);
    user.role = role;
    store.insert_user(&user).await.unwrap();
    user
}
