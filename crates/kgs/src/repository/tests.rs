use crate::{Error, MemoryRepository, Repository};
use std::collections::HashSet;
use std::sync::Arc;

async fn seed<R: Repository>(repo: &R, keys: &[&str]) {
    for key in keys {
        repo.write_key((*key).to_string()).await.unwrap();
    }
}

const TEN_KEYS: [&str; 10] = [
    "aaaa", "bbbb", "cccc", "dddd", "eeee", "ffff", "gggg", "hhhh", "iiii", "jjjj",
];

async fn run_absent_key_is_not_an_error<R: Repository>(repo: R) {
    assert_eq!(repo.key_exists("zzzz").await, Ok(false));
    seed(&repo, &["zzzz"]).await;
    assert_eq!(repo.key_exists("zzzz").await, Ok(true));
}

async fn run_duplicate_write_is_rejected<R: Repository>(repo: R) {
    seed(&repo, &["abcd"]).await;
    assert_eq!(
        repo.write_key("abcd".to_string()).await,
        Err(Error::DuplicateKey {
            key: "abcd".to_string()
        })
    );
}

async fn run_used_key_is_never_rewritten<R: Repository>(repo: R) {
    seed(&repo, &["abcd"]).await;
    assert_eq!(repo.get_keys(1).await.unwrap(), vec!["abcd".to_string()]);

    assert!(repo.write_key("abcd".to_string()).await.unwrap_err().is_collision());
    assert_eq!(repo.key_exists("abcd").await, Ok(true));
    assert!(matches!(
        repo.get_keys(1).await,
        Err(Error::InsufficientSupply { .. })
    ));
}

async fn run_invalid_counts_are_rejected<R: Repository>(repo: R) {
    seed(&repo, &TEN_KEYS).await;
    assert_eq!(repo.get_keys(0).await, Err(Error::InvalidCount { count: 0 }));
    assert_eq!(repo.get_keys(-3).await, Err(Error::InvalidCount { count: -3 }));
    assert_eq!(repo.get_keys(10).await.unwrap().len(), 10);
}

async fn run_oversized_request_removes_nothing<R: Repository>(repo: R) {
    seed(&repo, &TEN_KEYS).await;
    assert_eq!(
        repo.get_keys(11).await,
        Err(Error::InsufficientSupply {
            requested: 11,
            available: 10
        })
    );
    let all: HashSet<_> = repo.get_keys(10).await.unwrap().into_iter().collect();
    let expected: HashSet<_> = TEN_KEYS.iter().map(|k| k.to_string()).collect();
    assert_eq!(all, expected);
}

async fn run_handed_out_keys_never_reappear<R: Repository>(repo: R) {
    seed(&repo, &TEN_KEYS).await;
    let first = repo.get_keys(4).await.unwrap();
    let rest = repo.get_keys(6).await.unwrap();

    let mut seen = HashSet::new();
    for key in first.iter().chain(&rest) {
        assert!(seen.insert(key.clone()), "{key} handed out twice");
        assert_eq!(repo.key_exists(key).await, Ok(true));
    }
    assert_eq!(seen.len(), 10);
}

async fn run_concurrent_batches_partition_the_pool<R: Repository + 'static>(repo: Arc<R>) {
    seed(repo.as_ref(), &TEN_KEYS).await;

    let a = tokio::spawn({
        let repo = Arc::clone(&repo);
        async move { repo.get_keys(5).await }
    });
    let b = tokio::spawn({
        let repo = Arc::clone(&repo);
        async move { repo.get_keys(5).await }
    });
    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    assert_eq!(a.len(), 5);
    assert_eq!(b.len(), 5);
    let a: HashSet<_> = a.into_iter().collect();
    let b: HashSet<_> = b.into_iter().collect();
    assert!(a.is_disjoint(&b));
    assert_eq!(a.len() + b.len(), 10);
    assert!(matches!(
        repo.get_keys(1).await,
        Err(Error::InsufficientSupply { available: 0, .. })
    ));
}

async fn run_concurrent_writers_of_one_key<R: Repository + 'static>(repo: Arc<R>) {
    const WRITERS: usize = 16;

    let mut handles = Vec::with_capacity(WRITERS);
    for _ in 0..WRITERS {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(
            async move { repo.write_key("race".to_string()).await },
        ));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => wins += 1,
            Err(e) => assert!(e.is_collision(), "{e}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(repo.get_keys(1).await.unwrap(), vec!["race".to_string()]);
}

#[tokio::test]
async fn memory_absent_key_is_not_an_error() {
    run_absent_key_is_not_an_error(MemoryRepository::new()).await;
}

#[tokio::test]
async fn memory_duplicate_write_is_rejected() {
    run_duplicate_write_is_rejected(MemoryRepository::new()).await;
}

#[tokio::test]
async fn memory_used_key_is_never_rewritten() {
    run_used_key_is_never_rewritten(MemoryRepository::new()).await;
}

#[tokio::test]
async fn memory_invalid_counts_are_rejected() {
    run_invalid_counts_are_rejected(MemoryRepository::new()).await;
}

#[tokio::test]
async fn memory_oversized_request_removes_nothing() {
    run_oversized_request_removes_nothing(MemoryRepository::new()).await;
}

#[tokio::test]
async fn memory_handed_out_keys_never_reappear() {
    run_handed_out_keys_never_reappear(MemoryRepository::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_concurrent_batches_partition_the_pool() {
    run_concurrent_batches_partition_the_pool(Arc::new(MemoryRepository::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_concurrent_writers_of_one_key() {
    run_concurrent_writers_of_one_key(Arc::new(MemoryRepository::new())).await;
}

#[tokio::test]
async fn memory_outage_fails_every_call_without_side_effects() {
    let repo = MemoryRepository::new();
    seed(&repo, &["abcd"]).await;
    repo.set_unavailable(true);

    assert!(matches!(
        repo.key_exists("abcd").await,
        Err(Error::StoreUnavailable { .. })
    ));
    assert!(matches!(
        repo.write_key("efgh".to_string()).await,
        Err(Error::StoreUnavailable { .. })
    ));
    assert!(matches!(
        repo.get_keys(1).await,
        Err(Error::StoreUnavailable { .. })
    ));

    repo.set_unavailable(false);
    assert_eq!(repo.available_len(), 1);
    assert_eq!(repo.used_len(), 0);
    assert!(!repo.is_used("abcd"));
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use crate::SqliteRepository;

    fn repo() -> SqliteRepository {
        SqliteRepository::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn sqlite_absent_key_is_not_an_error() {
        run_absent_key_is_not_an_error(repo()).await;
    }

    #[tokio::test]
    async fn sqlite_duplicate_write_is_rejected() {
        run_duplicate_write_is_rejected(repo()).await;
    }

    #[tokio::test]
    async fn sqlite_used_key_is_never_rewritten() {
        run_used_key_is_never_rewritten(repo()).await;
    }

    #[tokio::test]
    async fn sqlite_invalid_counts_are_rejected() {
        run_invalid_counts_are_rejected(repo()).await;
    }

    #[tokio::test]
    async fn sqlite_oversized_request_removes_nothing() {
        run_oversized_request_removes_nothing(repo()).await;
    }

    #[tokio::test]
    async fn sqlite_handed_out_keys_never_reappear() {
        run_handed_out_keys_never_reappear(repo()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sqlite_concurrent_batches_partition_the_pool() {
        run_concurrent_batches_partition_the_pool(Arc::new(repo())).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sqlite_concurrent_writers_of_one_key() {
        run_concurrent_writers_of_one_key(Arc::new(repo())).await;
    }

    #[tokio::test]
    async fn sqlite_counts_track_both_partitions() {
        let repo = repo();
        seed(&repo, &TEN_KEYS).await;
        repo.get_keys(3).await.unwrap();
        assert_eq!(repo.available_len().await, Ok(7));
        assert_eq!(repo.used_len().await, Ok(3));
    }
}
