use anyhow::Result;
use retention::{LocalStore, Store, StoreError};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write_file(root: &Path, relative: &str, contents: &[u8], age: Duration) -> Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    fs::File::options()
        .write(true)
        .open(&path)?
        .set_modified(SystemTime::now() - age)?;
    Ok(())
}

#[tokio::test]
async fn test_list_skips_directories() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_file(temp_dir.path(), "a.tar", b"a", Duration::from_secs(60))?;
    write_file(temp_dir.path(), "b.tar", b"bb", Duration::from_secs(30))?;
    write_file(temp_dir.path(), "daily/old.tar", b"old", Duration::from_secs(90))?;

    let store = LocalStore::new(temp_dir.path());
    let mut root = store.list("").await?;
    root.sort_by(|a, b| a.name.cmp(&b.name));

    let names: Vec<&str> = root.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["a.tar", "b.tar"]);
    assert_eq!(root[1].size_bytes, 2);
    assert!(root[0].created_at < root[1].created_at);

    let daily = store.list("daily").await?;
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0].name, "daily/old.tar");

    Ok(())
}

#[tokio::test]
async fn test_list_missing_directory_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = LocalStore::new(temp_dir.path());

    let err = store.list("weekly").await.unwrap_err();
    assert!(matches!(err, StoreError::ListFailed { ref prefix, .. } if prefix == "weekly"));

    Ok(())
}

#[tokio::test]
async fn test_copy_creates_directories_and_keeps_source() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_file(temp_dir.path(), "snap.tar", b"payload", Duration::ZERO)?;

    let store = LocalStore::new(temp_dir.path());
    store.copy("snap.tar", "monthly/snap.tar").await?;

    assert_eq!(fs::read(temp_dir.path().join("snap.tar"))?, b"payload");
    assert_eq!(
        fs::read(temp_dir.path().join("monthly").join("snap.tar"))?,
        b"payload"
    );

    let monthly = store.list("monthly").await?;
    assert_eq!(monthly.len(), 1);
    assert_eq!(monthly[0].name, "monthly/snap.tar");

    Ok(())
}

#[tokio::test]
async fn test_copy_missing_source_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = LocalStore::new(temp_dir.path());

    let err = store.copy("missing.tar", "daily/missing.tar").await.unwrap_err();
    assert!(matches!(err, StoreError::CopyFailed { .. }));
    assert!(!temp_dir.path().join("daily").exists());

    Ok(())
}

#[tokio::test]
async fn test_copy_unwritable_destination_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_file(temp_dir.path(), "snap.tar", b"payload", Duration::ZERO)?;
    // A regular file where the tier directory should be
    write_file(temp_dir.path(), "daily", b"not a directory", Duration::ZERO)?;

    let store = LocalStore::new(temp_dir.path());
    let err = store.copy("snap.tar", "daily/snap.tar").await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::CopyFailed { ref source_path, ref destination, .. }
            if source_path == "snap.tar" && destination == "daily/snap.tar"
    ));
    assert_eq!(fs::read(temp_dir.path().join("snap.tar"))?, b"payload");

    Ok(())
}

#[tokio::test]
async fn test_delete() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_file(temp_dir.path(), "daily/a.tar", b"a", Duration::ZERO)?;

    let store = LocalStore::new(temp_dir.path());
    store.delete("daily/a.tar").await?;
    assert!(!temp_dir.path().join("daily").join("a.tar").exists());

    let err = store.delete("daily/a.tar").await.unwrap_err();
    assert!(matches!(err, StoreError::DeleteFailed { ref path, .. } if path == "daily/a.tar"));

    Ok(())
}
