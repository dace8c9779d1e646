//! End-to-end tests of the services wired from configuration.

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;

use fgadmin_domain::{PageTokens, Permission, PoolError};
use fgadmin_server::observability::init_logging;
use fgadmin_server::{AdminServices, ServerConfig, ServiceError};
use fgadmin_storage::{MemoryTupleStore, TupleStore};
use serial_test::serial;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

fn config(page_size: usize, workers: usize) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.store.page_size = page_size;
    config.pool.workers = workers;
    config
}

#[tokio::test]
async fn test_group_lifecycle() {
    let store = Arc::new(MemoryTupleStore::with_page_size(2));
    let services = AdminServices::with_store(store.clone(), &config(2, 4));
    let groups = &services.groups;
    let cancel = CancellationToken::new();

    groups.create_group("admin", "platform").await.unwrap();
    groups
        .assign_identities("platform", &["alice".to_string(), "bob".to_string()])
        .await
        .unwrap();
    groups
        .assign_roles("platform", &["operator".to_string()])
        .await
        .unwrap();

    let permissions: Vec<Permission> = [
        "can_view::client:okta",
        "can_edit::client:github",
        "can_delete::client:slack",
        "can_view::provider:google",
        "can_edit::provider:azure",
        "can_view::provider:okta",
    ]
    .iter()
    .map(|urn| urn.parse().unwrap())
    .collect();
    groups
        .assign_permissions("platform", &permissions)
        .await
        .unwrap();

    // Page through with the opaque token, as a transport would. Both
    // populated partitions need two pages at this page size.
    let mut token = String::new();
    let mut listed = Vec::new();
    for _ in 0..10 {
        let page = groups
            .list_permissions(&cancel, "platform", PageTokens::decode(&token))
            .await
            .unwrap();
        assert!(page.error().is_none());
        listed.extend(page.items.clone());
        token = page.next_page_tokens.encode();
        if page.is_last_page() {
            break;
        }
    }
    let expected: BTreeSet<String> = permissions.iter().map(Permission::urn).collect();
    assert_eq!(listed.len(), expected.len(), "no permission is listed twice");
    assert_eq!(listed.into_iter().collect::<BTreeSet<_>>(), expected);

    groups.delete_group(&cancel, "platform").await.unwrap();
    assert!(store.is_empty());
    assert!(groups.list_groups("admin").await.unwrap().is_empty());

    services.shutdown().await;
}

#[tokio::test]
async fn test_services_share_one_pool() {
    let store: Arc<dyn TupleStore> = Arc::new(MemoryTupleStore::new());
    let services = AdminServices::with_store(store, &config(10, 2));
    assert_eq!(services.pool().workers(), 2);

    services.roles.create_role("admin", "viewer").await.unwrap();
    services
        .roles
        .assign_permissions("viewer", &["can_view::client:okta".parse().unwrap()])
        .await
        .unwrap();
    let page = services
        .roles
        .list_permissions(&CancellationToken::new(), "viewer", PageTokens::new())
        .await
        .unwrap();
    assert_eq!(page.items, vec!["can_view::client:okta"]);

    services.shutdown().await;
    assert!(services.pool().is_closed());

    // Fan-out after shutdown is rejected as a whole
    let err = services
        .groups
        .list_permissions(&CancellationToken::new(), "eng", PageTokens::new())
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::Pool(PoolError::Closed));
}

#[tokio::test]
#[serial]
async fn test_services_from_yaml_config() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
pool:
  workers: 3
  queue_capacity: 8
store:
  backend: memory
  page_size: 5
logging:
  level: debug
  json: true
"#
    )
    .unwrap();

    let config = ServerConfig::load(file.path()).unwrap();
    let services = AdminServices::from_config(&config).unwrap();
    assert_eq!(services.pool().workers(), 3);
    assert_eq!(services.pool().config().queue_capacity, 8);
    // Logging is already installed for the process
    assert!(!init_logging(&config.logging).unwrap());

    services.groups.create_group("admin", "eng").await.unwrap();
    assert_eq!(
        services.groups.get_group("admin", "eng").await.unwrap(),
        Some("eng".to_string())
    );
    services.shutdown().await;
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = ServerConfig::default();
    config.pool.workers = 0;
    assert!(AdminServices::from_config(&config).is_err());
}
