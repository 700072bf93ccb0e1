use crate::db::Catalog;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_migrations_apply_on_fresh_catalog() {
    let temp_file = NamedTempFile::new().unwrap();
    let catalog = Catalog::new(temp_file.path()).await.unwrap();

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(catalog.pool())
        .await
        .unwrap();
    assert_eq!(version, 1);

    catalog.close().await;
}

#[tokio::test]
async fn test_reopening_catalog_is_idempotent() {
    let temp_file = NamedTempFile::new().unwrap();

    let first = Catalog::new(temp_file.path()).await.unwrap();
    first.close().await;

    // Second open must not re-apply migrations or fail
    let second = Catalog::new(temp_file.path()).await.unwrap();
    let versions: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_version")
        .fetch_all(second.pool())
        .await
        .unwrap();
    assert_eq!(versions, vec![1]);

    second.close().await;
}

#[tokio::test]
async fn test_catalog_creates_parent_directories() {
    let temp_dir = tempfile::tempdir().unwrap();
    let nested = temp_dir.path().join("deeply/nested/catalog.db");

    let catalog = Catalog::new(&nested).await.unwrap();
    assert!(nested.exists());

    catalog.close().await;
}
