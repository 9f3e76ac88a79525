use std::collections::HashMap;

use irhabi_core::AppError;
use irhabi_core::common::password_verify;
use irhabi_db::{Database, NewUser, RequestQuery, UserRepository};

use crate::integration::common::setup_test_db;

fn new_user(name: &str, email: &str) -> NewUser {
    NewUser {
        name: name.into(),
        email: email.into(),
        password: "secret123".into(),
    }
}

fn query(pairs: &[(&str, &str)]) -> RequestQuery {
    let params: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    RequestQuery::from_params(&params)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn create_and_find_user() {
    let (pool, _container) = setup_test_db().await;
    let repo = UserRepository::new(pool);

    let user = repo.create(&new_user("Jane Doe", "jane@example.com")).await.unwrap();
    assert!(user.id > 0);
    assert!(user.is_active);
    assert!(password_verify(&user.password, "secret123"));

    let found = repo
        .find_by_email("jane@example.com")
        .await
        .unwrap()
        .expect("Should find the user");
    assert_eq!(found.id, user.id);

    assert!(repo.find_by_id(user.id + 100).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn duplicate_email_is_data_exists() {
    let (pool, _container) = setup_test_db().await;
    let repo = UserRepository::new(pool);

    repo.create(&new_user("Jane Doe", "jane@example.com")).await.unwrap();
    let err = repo
        .create(&new_user("Jane Other", "jane@example.com"))
        .await
        .unwrap_err();

    match err {
        AppError::DataExists { field, .. } => assert_eq!(field, "email"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn list_applies_request_query() {
    let (pool, _container) = setup_test_db().await;
    let repo = UserRepository::new(pool);

    for (name, email) in [
        ("Alice", "alice@example.com"),
        ("Bob", "bob@example.com"),
        ("Carol", "carol@example.com"),
        ("Dave", "dave@example.com"),
    ] {
        repo.create(&new_user(name, email)).await.unwrap();
    }

    let page = repo
        .list(&query(&[("orderby", "-id"), ("perpage", "2"), ("page", "1")]))
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].name, "Dave");

    let page = repo
        .list(&query(&[("conditions", "name__icontains:a,Or.name:Bob")]))
        .await
        .unwrap();
    let mut names: Vec<_> = page.items.iter().map(|u| u.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Alice", "Bob", "Carol", "Dave"]);

    let page = repo
        .list(&query(&[("conditions", "id__in:1.2"), ("fields", "id,name")]))
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|u| u.email.is_empty()));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn health_check_succeeds() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    db.health_check().await.unwrap();
}
