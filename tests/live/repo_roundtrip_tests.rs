//! Live tests for repository create/get/update/delete round trips.

use chrono::Utc;
use recordkeeper::AppError;

use super::test_helpers::{bare_draft, draft, fresh_repo};

#[tokio::test]
#[serial_test::serial]
async fn create_then_get_round_trips_every_field() {
    let repo = fresh_repo().await;
    let original = draft("Alice Roy");

    let id = repo.create(&original).await.expect("create");
    let record = repo.get(id).await.expect("get").expect("record exists");

    assert_eq!(record.id, id);
    assert_eq!(record.person, original);
    let age = Utc::now() - record.created_at;
    assert!(
        age >= chrono::Duration::zero() && age < chrono::Duration::minutes(5),
        "created_at should be recent, got {}",
        record.created_at
    );
}

#[tokio::test]
#[serial_test::serial]
async fn duplicate_child_values_survive_the_round_trip() {
    let repo = fresh_repo().await;
    let mut original = draft("Alice Roy");
    original.mobile_numbers = vec!["same-number".into(), "same-number".into()];
    original.pdf_urls = vec!["https://i.ibb.co/x/p.jpg".into(); 3];

    let id = repo.create(&original).await.expect("create");
    let record = repo.get(id).await.expect("get").expect("record exists");

    assert_eq!(record.person.mobile_numbers, original.mobile_numbers);
    assert_eq!(record.person.pdf_urls, original.pdf_urls);
}

#[tokio::test]
#[serial_test::serial]
async fn optional_fields_round_trip_as_absent() {
    let repo = fresh_repo().await;
    let original = bare_draft("Bob Karim");

    let id = repo.create(&original).await.expect("create");
    let record = repo.get(id).await.expect("get").expect("record exists");

    assert!(record.person.voter_number.is_none());
    assert!(record.person.profile_image.is_none());
    assert!(record.person.description.is_none());
    assert!(record.person.mobile_numbers.is_empty());
    assert!(record.person.whatsapp_numbers.is_empty());
    assert!(record.person.facebook_links.is_empty());
    assert!(record.person.website_links.is_empty());
    assert!(record.person.pdf_urls.is_empty());
}

#[tokio::test]
#[serial_test::serial]
async fn get_unknown_id_returns_none() {
    let repo = fresh_repo().await;

    let record = repo.get(999_999).await.expect("get");
    assert!(record.is_none());
}

#[tokio::test]
#[serial_test::serial]
async fn update_rewrites_scalars_and_children_without_residue() {
    let repo = fresh_repo().await;
    let id = repo.create(&draft("Alice Roy")).await.expect("create");
    let created = repo.get(id).await.expect("get").expect("record exists");

    let mut replacement = bare_draft("Alice Chowdhury");
    replacement.mobile_numbers = vec!["01999-111111".into()];
    replacement.pdf_urls = vec!["https://i.ibb.co/new/only.jpg".into()];

    repo.update(id, &replacement).await.expect("update");
    let record = repo.get(id).await.expect("get").expect("record exists");

    // The replacement is the complete child set: nothing from the first
    // draft may linger.
    assert_eq!(record.person, replacement);
    assert_eq!(record.id, id);
    assert_eq!(
        record.created_at, created.created_at,
        "created_at is immutable across updates"
    );
}

#[tokio::test]
#[serial_test::serial]
async fn update_unknown_id_is_not_found() {
    let repo = fresh_repo().await;

    let result = repo.update(999_999, &draft("Nobody")).await;
    match result {
        Err(AppError::NotFound(_)) => {}
        other => panic!("expected not-found error, got {other:?}"),
    }
}

#[tokio::test]
#[serial_test::serial]
async fn delete_removes_the_record() {
    let repo = fresh_repo().await;
    let id = repo.create(&draft("Alice Roy")).await.expect("create");

    repo.delete(id).await.expect("delete");

    assert!(repo.get(id).await.expect("get").is_none());
    assert!(repo.list_all().await.expect("list").is_empty());
}

#[tokio::test]
#[serial_test::serial]
async fn delete_unknown_id_is_not_found() {
    let repo = fresh_repo().await;

    let result = repo.delete(999_999).await;
    match result {
        Err(AppError::NotFound(_)) => {}
        other => panic!("expected not-found error, got {other:?}"),
    }
}

#[tokio::test]
#[serial_test::serial]
async fn delete_all_clears_everything_and_reports_the_count() {
    let repo = fresh_repo().await;
    for name in ["Alice Roy", "Bob Karim", "Carol Smith"] {
        repo.create(&draft(name)).await.expect("create");
    }

    let deleted = repo.delete_all().await.expect("delete all");

    assert_eq!(deleted, 3);
    assert!(repo.list_all().await.expect("list").is_empty());
}

#[tokio::test]
#[serial_test::serial]
async fn listing_returns_newest_first() {
    let repo = fresh_repo().await;
    let first = repo.create(&draft("Alice Roy")).await.expect("create");
    let second = repo.create(&draft("Bob Karim")).await.expect("create");
    let third = repo.create(&draft("Carol Smith")).await.expect("create");

    let records = repo.list_all().await.expect("list");
    let ids: Vec<i64> = records.iter().map(|record| record.id).collect();

    assert_eq!(ids, vec![third, second, first]);
}

#[tokio::test]
#[serial_test::serial]
async fn concurrent_creates_get_distinct_ids() {
    let repo = fresh_repo().await;

    // Bound before join! so each borrow outlives the whole expression.
    let drafts = [
        draft("Person A"),
        draft("Person B"),
        draft("Person C"),
        draft("Person D"),
    ];
    let (a, b, c, d) = tokio::join!(
        repo.create(&drafts[0]),
        repo.create(&drafts[1]),
        repo.create(&drafts[2]),
        repo.create(&drafts[3]),
    );
    let mut ids = vec![
        a.expect("create a"),
        b.expect("create b"),
        c.expect("create c"),
        d.expect("create d"),
    ];

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4, "each create must get its own id");
    assert_eq!(repo.list_all().await.expect("list").len(), 4);
}
