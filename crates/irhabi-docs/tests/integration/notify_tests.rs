use irhabi_docs::{
    MongoNotificationStore, NewNotification, NoopPusher, NotificationStore, Notifier, ObjectAction,
};

use crate::integration::common::setup_test_mongo;

fn new_notification(message: &str) -> NewNotification {
    NewNotification {
        user_id: 3,
        device_id: "device-3".into(),
        title: "Invoice".into(),
        message: message.into(),
        action_url: "/invoices/1".into(),
        object_action: Some(ObjectAction {
            id: "1".into(),
            action: "pay".into(),
        }),
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn notification_lifecycle() {
    let (db, _container) = setup_test_mongo("notify_document").await;
    let notifier = Notifier::new(MongoNotificationStore::new(&db, "notify_document"), NoopPusher);

    let first = notifier.create(&new_notification("first")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    notifier.create(&new_notification("second")).await.unwrap();

    let store = notifier.store();
    let listed = store.by_user(3).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].message, "second");
    assert_eq!(store.by_device("device-3").await.unwrap().len(), 2);

    assert!(store.read_by_id(&first.id).await.unwrap());
    assert!(!store.read_by_id(&first.id).await.unwrap());
    assert!(!store.read_by_id("not-an-object-id").await.unwrap());

    assert!(store.read_by_object_action(3, "1", "pay").await.unwrap());
    assert_eq!(store.read_all(3).await.unwrap(), 0);

    let listed = store.by_user(3).await.unwrap();
    assert!(listed.iter().all(|n| n.readed && n.readed_at.is_some()));

    assert_eq!(store.clean(3).await.unwrap(), 2);
}
