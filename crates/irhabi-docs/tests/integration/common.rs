use irhabi_docs::MongoConfig;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// Spins up a MongoDB container and returns a connected database.
///
/// The `ContainerAsync` must be kept in scope for the test duration;
/// dropping it stops the container.
pub async fn setup_test_mongo(
    collection: &str,
) -> (mongodb::Database, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("mongo", "7")
        .with_exposed_port(ContainerPort::Tcp(27017))
        .with_wait_for(WaitFor::message_on_stdout("Waiting for connections"))
        .start()
        .await
        .expect("Failed to start MongoDB container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(27017)
        .await
        .expect("Failed to get port");

    let config = MongoConfig {
        uri: format!("mongodb://{host}:{port}"),
        database: "irhabi_test".into(),
        collection: collection.into(),
    };

    const MAX_RETRIES: u32 = 30;
    let mut retries = 0;
    let db = loop {
        match config.connect().await {
            Ok(db) => break db,
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    panic!("Failed to connect to MongoDB after {MAX_RETRIES} retries: {e}");
                }
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
        }
    };

    (db, container)
}
