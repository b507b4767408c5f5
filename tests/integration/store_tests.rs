//! Integration tests for the crawl store
//!
//! These tests run the store against real database files and drive it from
//! many threads at once, checking the guarantees a crawler relies on: no
//! lost cookie updates and exactly-once claims from the request queue.

use crawl_store::config::{parse_config, StorageConfig};
use crawl_store::storage::{
    open_storage, LenientCookieJar, QueueStorage, SqliteStorage, Storage, StorageError,
};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;
use url::Url;

/// Creates an initialized file-backed store inside `dir`
fn create_test_storage(dir: &TempDir) -> SqliteStorage {
    let path = dir.path().join("crawl-state.db");
    let storage = SqliteStorage::new(&path);
    storage.init().expect("Failed to initialize storage");
    storage
}

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let storage = create_test_storage(&dir);
        storage.visited(42).unwrap();
        storage.set_cookies("a.com", "k=v").unwrap();
        storage.add_request(&[1, 2, 3]).unwrap();
        storage.add_request(&[4, 5, 6]).unwrap();
        storage.close().unwrap();
    }

    let storage = create_test_storage(&dir);
    assert!(storage.is_visited(42).unwrap());
    assert!(!storage.is_visited(99).unwrap());
    assert_eq!(storage.cookies("a.com").unwrap().as_deref(), Some("k=v"));
    assert_eq!(storage.queue_size().unwrap(), 2);
    assert_eq!(storage.get_request().unwrap(), Some(vec![1, 2, 3]));
}

#[test]
fn test_init_after_close_reopens() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir);
    storage.visited(7).unwrap();

    storage.close().unwrap();
    assert!(matches!(storage.is_visited(7), Err(StorageError::Closed)));

    storage.init().unwrap();
    assert!(storage.is_visited(7).unwrap());
}

#[test]
fn test_init_twice_on_file() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir);

    storage.init().unwrap();
    storage.init().unwrap();

    storage.add_request(b"still usable").unwrap();
    assert_eq!(storage.queue_size().unwrap(), 1);
}

#[test]
fn test_clear_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir);
    storage.visited(1).unwrap();
    storage.set_cookies("a.com", "k=v").unwrap();
    storage.add_request(b"payload").unwrap();

    storage.clear().unwrap();
    storage.close().unwrap();

    let storage = create_test_storage(&dir);
    assert!(!storage.is_visited(1).unwrap());
    assert_eq!(storage.cookies("a.com").unwrap(), None);
    assert_eq!(storage.queue_size().unwrap(), 0);
    assert_eq!(storage.get_request().unwrap(), None);
}

#[test]
fn test_concurrent_claims_deliver_each_entry_once() {
    const ENTRIES: usize = 200;
    const WORKERS: usize = 8;

    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir);

    for i in 0..ENTRIES {
        storage.add_request(format!("request-{}", i).as_bytes()).unwrap();
    }

    let barrier = Barrier::new(WORKERS);
    let (storage, barrier) = (&storage, &barrier);
    let claimed: Vec<Vec<u8>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                scope.spawn(move || {
                    barrier.wait();
                    let mut mine = Vec::new();
                    while let Some(payload) = storage.get_request().unwrap() {
                        mine.push(payload);
                    }
                    mine
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(claimed.len(), ENTRIES, "every entry delivered");
    let unique: HashSet<_> = claimed.iter().collect();
    assert_eq!(unique.len(), ENTRIES, "no entry delivered twice");
    assert_eq!(storage.queue_size().unwrap(), 0);
    assert_eq!(storage.get_request().unwrap(), None);
}

#[test]
fn test_n_entries_n_claimers() {
    const N: usize = 16;

    let storage = SqliteStorage::in_memory();
    storage.init().unwrap();
    let storage = Arc::new(storage);
    for i in 0..N {
        storage.add_request(&(i as u32).to_be_bytes()).unwrap();
    }

    let barrier = Arc::new(Barrier::new(N));
    let handles: Vec<_> = (0..N)
        .map(|_| {
            let storage = Arc::clone(&storage);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                storage.get_request().unwrap()
            })
        })
        .collect();

    let mut claimed: Vec<Vec<u8>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().expect("each claimer gets an entry"))
        .collect();
    claimed.sort();

    let expected: Vec<Vec<u8>> = (0..N).map(|i| (i as u32).to_be_bytes().to_vec()).collect();
    assert_eq!(claimed, expected);
}

#[test]
fn test_two_instances_share_one_queue() {
    const ENTRIES: usize = 100;

    let dir = TempDir::new().unwrap();
    let first = create_test_storage(&dir);
    let second = create_test_storage(&dir);

    for i in 0..ENTRIES {
        first.add_request(format!("{}", i).as_bytes()).unwrap();
    }

    let claimed: Vec<Vec<u8>> = thread::scope(|scope| {
        let a = scope.spawn(|| drain(&first));
        let b = scope.spawn(|| drain(&second));
        let mut all = a.join().unwrap();
        all.extend(b.join().unwrap());
        all
    });

    let unique: HashSet<_> = claimed.iter().collect();
    assert_eq!(claimed.len(), ENTRIES);
    assert_eq!(unique.len(), ENTRIES);
}

fn drain(storage: &SqliteStorage) -> Vec<Vec<u8>> {
    let mut claimed = Vec::new();
    while let Some(payload) = storage.get_request().unwrap() {
        claimed.push(payload);
    }
    claimed
}

#[test]
fn test_producers_and_consumers() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 50;

    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir);

    thread::scope(|scope| {
        for p in 0..PRODUCERS {
            let storage = &storage;
            scope.spawn(move || {
                for i in 0..PER_PRODUCER {
                    storage
                        .add_request(format!("{}-{}", p, i).as_bytes())
                        .unwrap();
                }
            });
        }
    });

    // FIFO within one producer: its entries come back in the order it added them
    let drained = drain(&storage);
    assert_eq!(drained.len(), PRODUCERS * PER_PRODUCER);
    for p in 0..PRODUCERS {
        let prefix = format!("{}-", p);
        let sequence: Vec<usize> = drained
            .iter()
            .map(|payload| String::from_utf8(payload.clone()).unwrap())
            .filter_map(|s| s.strip_prefix(&prefix).map(|n| n.parse().unwrap()))
            .collect();
        assert_eq!(sequence, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}

#[test]
fn test_concurrent_cookie_writes_are_not_lost() {
    const HOSTS: usize = 32;

    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir);

    thread::scope(|scope| {
        for i in 0..HOSTS {
            let storage = &storage;
            scope.spawn(move || {
                storage
                    .set_cookies(&format!("host{}.example", i), &format!("id={}", i))
                    .unwrap();
            });
        }
    });

    assert_eq!(storage.count_cookie_hosts().unwrap(), HOSTS as u64);
    for i in 0..HOSTS {
        assert_eq!(
            storage.cookies(&format!("host{}.example", i)).unwrap(),
            Some(format!("id={}", i))
        );
    }
}

#[test]
fn test_concurrent_cookie_writes_same_host_keep_one_row() {
    const WRITERS: usize = 16;

    let storage = SqliteStorage::in_memory();
    storage.init().unwrap();

    thread::scope(|scope| {
        for i in 0..WRITERS {
            let storage = &storage;
            scope.spawn(move || {
                storage.set_cookies("a.com", &format!("k={}", i)).unwrap();
            });
        }
    });

    let stored = storage.cookies("a.com").unwrap().unwrap();
    let written: Vec<String> = (0..WRITERS).map(|i| format!("k={}", i)).collect();
    assert!(written.contains(&stored));
    assert_eq!(storage.count_cookie_hosts().unwrap(), 1);
}

#[test]
fn test_concurrent_visited_and_checks() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 100;

    let storage = SqliteStorage::in_memory();
    storage.init().unwrap();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let storage = &storage;
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    let id = t * PER_THREAD + i;
                    storage.visited(id).unwrap();
                    // A completed write is visible to the next read
                    assert!(storage.is_visited(id).unwrap());
                }
            });
        }
    });

    assert_eq!(storage.count_visited().unwrap(), THREADS * PER_THREAD);
}

#[test]
fn test_open_storage_from_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("configured.db");
    let toml = format!(
        "[storage]\ndatabase-path = \"{}\"\njournal-mode = \"delete\"\nbusy-timeout-ms = 100\n",
        path.display()
    );

    let config = parse_config(&toml).unwrap();
    let storage = open_storage(&config.storage).unwrap();

    storage.add_request(b"configured").unwrap();
    assert_eq!(storage.get_request().unwrap(), Some(b"configured".to_vec()));
    assert!(path.exists());
}

#[test]
fn test_open_storage_bad_path() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::new(
        dir.path()
            .join("no-such-dir")
            .join("state.db")
            .to_string_lossy(),
    );

    let result = open_storage(&config);
    assert!(matches!(result, Err(StorageError::Connection { .. })));
}

#[test]
fn test_lenient_cookie_jar_over_shared_store() {
    let storage = SqliteStorage::in_memory();
    storage.init().unwrap();
    let storage = Arc::new(storage);

    let jar = LenientCookieJar::new(Arc::clone(&storage));
    let url = Url::parse("https://example.com/account").unwrap();

    assert_eq!(jar.cookies(&url), "");
    jar.set_cookies(&url, "session=1");
    assert_eq!(jar.cookies(&url), "session=1");
    assert_eq!(
        storage.cookies("example.com").unwrap().as_deref(),
        Some("session=1")
    );

    storage.close().unwrap();
    assert_eq!(jar.cookies(&url), "");
}
