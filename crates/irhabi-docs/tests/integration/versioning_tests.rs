use irhabi_core::AppError;
use irhabi_docs::{MongoVersionStore, VersionStore};
use serde_json::json;

use crate::integration::common::setup_test_mongo;

#[tokio::test]
#[ignore = "requires docker"]
async fn create_show_history_clean() {
    let (db, _container) = setup_test_mongo("document_version").await;
    let store = MongoVersionStore::new(&db, "document_version");

    for i in 1..=5 {
        let doc = store
            .create("document_testing", 17, &json!({"name": format!("test {i}")}), &json!(null))
            .await
            .unwrap();
        assert_eq!(doc.version, i);

        let latest = store.show("document_testing", 17, None).await.unwrap();
        assert_eq!(latest.version, i);
    }

    let second = store.show("document_testing", 17, Some(2)).await.unwrap();
    assert_eq!(second.data, json!({"name": "test 2"}));

    let history = store.history("document_testing", 17).await.unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].version, 5);

    assert_eq!(store.clean("document_testing", 17).await.unwrap(), 5);
    assert!(matches!(
        store.show("document_testing", 17, None).await,
        Err(AppError::DataNotExists { .. })
    ));
}
