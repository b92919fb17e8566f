use super::store::*;
use crate::error::StevedoreError;
use tempfile::tempdir;

#[test]
fn test_file_credential_store_new_does_not_touch_disk() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("sub").join("keystore.toml");

    let store = FileCredentialStore::new(path.clone());

    assert!(!path.parent().unwrap().exists());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_file_credential_store_put_creates_parent_directory() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("sub").join("keystore.toml");

    let mut store = FileCredentialStore::new(path.clone());
    store.put("registry.example.com", "alice", "hunter2").unwrap();

    assert!(path.exists());
}

#[test]
fn test_file_credential_store_put_and_get() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("keystore.toml");

    let mut store = FileCredentialStore::new(path);
    store.put("registry.example.com", "alice", "hunter2").unwrap();

    let record = store.get("registry.example.com").unwrap().unwrap();
    assert_eq!(record.registry_host, "registry.example.com");
    assert_eq!(record.username, "alice");
    assert_eq!(record.secret, "hunter2");
}

#[test]
fn test_file_credential_store_secret_is_not_plaintext_on_disk() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("keystore.toml");

    let mut store = FileCredentialStore::new(path.clone());
    store.put("registry.example.com", "alice", "hunter2").unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("hunter2"));
}

#[test]
fn test_file_credential_store_get_unknown_host_returns_none() {
    let temp_dir = tempdir().unwrap();
    let store = FileCredentialStore::new(temp_dir.path().join("keystore.toml"));

    assert!(store.get("nowhere.example.com").unwrap().is_none());
}

#[test]
fn test_file_credential_store_put_replaces_existing_entry() {
    let temp_dir = tempdir().unwrap();
    let mut store = FileCredentialStore::new(temp_dir.path().join("keystore.toml"));

    store.put("registry.example.com", "alice", "old").unwrap();
    store.put("registry.example.com", "bob", "new").unwrap();

    let record = store.get("registry.example.com").unwrap().unwrap();
    assert_eq!(record.username, "bob");
    assert_eq!(record.secret, "new");
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn test_file_credential_store_delete_removes_entry() {
    let temp_dir = tempdir().unwrap();
    let mut store = FileCredentialStore::new(temp_dir.path().join("keystore.toml"));

    store.put("registry.example.com", "alice", "hunter2").unwrap();
    store.delete("registry.example.com").unwrap();

    assert!(store.get("registry.example.com").unwrap().is_none());
}

#[test]
fn test_file_credential_store_delete_unknown_host_is_ok() {
    let temp_dir = tempdir().unwrap();
    let mut store = FileCredentialStore::new(temp_dir.path().join("keystore.toml"));

    assert!(store.delete("nowhere.example.com").is_ok());
}

#[test]
fn test_file_credential_store_erase_removes_everything() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("keystore.toml");
    let mut store = FileCredentialStore::new(path.clone());

    store.put("one.example.com", "a", "1").unwrap();
    store.put("two.example.com", "b", "2").unwrap();
    store.erase().unwrap();

    assert!(!path.exists());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_file_credential_store_list_is_sorted() {
    let temp_dir = tempdir().unwrap();
    let mut store = FileCredentialStore::new(temp_dir.path().join("keystore.toml"));

    store.put("two.example.com", "b", "2").unwrap();
    store.put("one.example.com", "a", "1").unwrap();

    assert_eq!(
        store.list().unwrap(),
        vec!["one.example.com".to_string(), "two.example.com".to_string()]
    );
}

#[test]
fn test_file_credential_store_persists_across_instances() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("keystore.toml");

    {
        let mut store = FileCredentialStore::new(path.clone());
        store.put("registry.example.com", "alice", "hunter2").unwrap();
    }

    let store = FileCredentialStore::new(path);
    let record = store.get("registry.example.com").unwrap().unwrap();
    assert_eq!(record.secret, "hunter2");
}

#[test]
fn test_file_credential_store_malformed_keystore_is_config_error() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("keystore.toml");
    std::fs::write(&path, "this is [not valid toml").unwrap();

    let mut store = FileCredentialStore::new(path);

    assert!(matches!(
        store.put("registry.example.com", "alice", "hunter2"),
        Err(StevedoreError::Config { .. })
    ));
}

#[test]
fn test_file_credential_store_malformed_secret_is_validation_error() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("keystore.toml");
    std::fs::write(
        &path,
        "[\"registry.example.com\"]\nusername = \"alice\"\nsecret = \"%%%not-base64\"\n",
    )
    .unwrap();

    let store = FileCredentialStore::new(path);

    assert!(matches!(
        store.get("registry.example.com"),
        Err(StevedoreError::Validation { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_file_credential_store_sets_owner_only_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("keystore.toml");
    let mut store = FileCredentialStore::new(path.clone());
    store.put("registry.example.com", "alice", "hunter2").unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[cfg(unix)]
#[test]
fn test_file_credential_store_tightens_existing_keystore() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("keystore.toml");
    std::fs::write(&path, "").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let mut store = FileCredentialStore::new(path.clone());
    store.put("registry.example.com", "alice", "hunter2").unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(
        store.get("registry.example.com").unwrap().unwrap().secret,
        "hunter2"
    );
}
