use easehooks::{KeyValueStore, LocalStorageState, MemoryStorage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Prefs {
    theme: String,
    font_size: u8,
}

#[test]
fn test_value_survives_a_new_handle() {
    let storage = Arc::new(MemoryStorage::new());
    let prefs = Prefs {
        theme: "dark".to_string(),
        font_size: 14,
    };

    let first = LocalStorageState::<Prefs>::new(storage.clone(), "prefs").unwrap();
    assert_eq!(first.get(), None);
    first.set(Some(prefs.clone())).unwrap();

    let second = LocalStorageState::<Prefs>::new(storage.clone(), "prefs").unwrap();
    assert_eq!(second.get(), Some(prefs));
}

#[test]
fn test_strings_are_stored_raw() {
    let storage = Arc::new(MemoryStorage::new());
    let name = LocalStorageState::<String>::new(storage.clone(), "name").unwrap();
    name.set(Some("ada".to_string())).unwrap();

    assert_eq!(storage.get("name").unwrap(), Some("ada".to_string()));
}

#[test]
fn test_clearing_removes_the_key() {
    let storage = Arc::new(MemoryStorage::new());
    let count = LocalStorageState::<u32>::with_initial(storage.clone(), "count", 1).unwrap();
    count.update(|value| value.map(|n| n + 1)).unwrap();
    assert_eq!(count.get(), Some(2));

    count.set(None).unwrap();
    assert!(storage.is_empty());
    assert_eq!(count.get(), None);
}

#[test]
fn test_empty_stored_string_reads_as_absent() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set("name", "").unwrap();

    let name = LocalStorageState::<String>::new(storage.clone(), "name").unwrap();
    assert_eq!(name.get(), None);

    let name = LocalStorageState::<String>::with_initial(storage.clone(), "name", "ada".to_string()).unwrap();
    assert_eq!(name.get(), Some("ada".to_string()));
    assert_eq!(storage.get("name").unwrap(), Some("ada".to_string()));
}
