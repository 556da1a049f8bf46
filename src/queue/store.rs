//! Queue store backends.
//!
//! The protocol needs exactly four primitives from its backing store:
//!
//! - `push_back`: append a record to a named list (enqueue)
//! - `pop_front`: atomically pop the head of a list, blocking up to a
//!   timeout (dequeue / result wait)
//! - `put_single`: replace a key's contents with a single record and set its
//!   expiry (result publish)
//! - `ping`: connectivity check
//!
//! `pop_front`'s atomicity is what gives at-most-one-consumer delivery
//! across racing workers without any application-level locking.
//!
//! Two implementations sit behind the [`QueueStore`] trait and are selected
//! at startup: [`RedisStore`] for production and [`MemoryStore`] for tests
//! and store-less local runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::error::StoreError;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The list/key primitives the queue protocol is built on.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Appends a record to the tail of the named list.
    async fn push_back(&self, key: &str, value: String) -> Result<()>;

    /// Pops the head of the named list, blocking up to `timeout`.
    ///
    /// Returns `None` if nothing arrived in time. Exactly one caller
    /// receives any given record, however many are blocked on the key.
    async fn pop_front(&self, key: &str, timeout: Duration) -> Result<Option<String>>;

    /// Replaces the key's contents with a single record and sets its expiry.
    ///
    /// The key remains list-shaped so `pop_front` works unchanged; a second
    /// publish for the same key overwrites the unconsumed record rather than
    /// queueing behind it.
    async fn put_single(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Verifies the store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// Redis-backed store: RPUSH / BLPOP / DEL+RPUSH+EXPIRE / PING.
///
/// Non-blocking commands share one multiplexed connection. Blocking pops
/// each take a dedicated connection so a parked BLPOP cannot head-of-line
/// block unrelated commands.
pub struct RedisStore {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connects to the store at the given URL (e.g. `redis://localhost:6379/0`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(StoreError::Connection)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::Connection)?;
        Ok(RedisStore { client, conn })
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn push_back(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(key, value).await?;
        Ok(())
    }

    async fn pop_front(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let reply: Option<(String, String)> = conn.blpop(key, timeout.as_secs_f64()).await?;
        Ok(reply.map(|(_key, value)| value))
    }

    async fn put_single(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(key)
            .ignore()
            .rpush(key, value)
            .ignore()
            .expire(key, ttl.as_secs() as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// A list entry: queued records plus an optional expiry deadline.
///
/// The pending-jobs list never carries a deadline; result keys always do.
#[derive(Debug, Default)]
struct Entry {
    records: VecDeque<String>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: Mutex<HashMap<String, Entry>>,
    /// Woken on every write so blocked `pop_front` callers re-check.
    notify: Notify,
}

/// In-process store with the same blocking-pop and expiry semantics as the
/// Redis backing.
///
/// Pops race through a single mutex, so at-most-one-consumer delivery holds
/// for concurrent in-process waiters exactly as BLPOP does across processes.
/// Expiry is enforced lazily, on the next read of the key.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Pops the head of `key` if a live record is present.
    fn try_pop(&self, key: &str) -> Option<String> {
        let mut entries = self.inner.entries.lock().expect("store mutex poisoned");
        let now = Instant::now();

        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            return None;
        }

        let entry = entries.get_mut(key)?;
        let record = entry.records.pop_front();
        if entry.records.is_empty() && entry.expires_at.is_none() {
            entries.remove(key);
        }
        record
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn push_back(&self, key: &str, value: String) -> Result<()> {
        {
            let mut entries = self.inner.entries.lock().expect("store mutex poisoned");
            let now = Instant::now();
            if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
                entries.remove(key);
            }
            entries.entry(key.to_string()).or_default().records.push_back(value);
        }
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn pop_front(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register for wakeup before checking, so a push between the
            // check and the await cannot be missed.
            notified.as_mut().enable();

            if let Some(record) = self.try_pop(key) {
                return Ok(Some(record));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn put_single(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        {
            let mut entries = self.inner.entries.lock().expect("store mutex poisoned");
            entries.insert(
                key.to_string(),
                Entry {
                    records: VecDeque::from([value]),
                    expires_at: Some(Instant::now() + ttl),
                },
            );
        }
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn push_then_pop_returns_record() {
        let store = MemoryStore::new();
        store.push_back("q", "a".into()).await.unwrap();
        assert_eq!(store.pop_front("q", SHORT).await.unwrap(), Some("a".into()));
    }

    #[tokio::test]
    async fn pop_preserves_fifo_order() {
        let store = MemoryStore::new();
        for record in ["a", "b", "c"] {
            store.push_back("q", record.into()).await.unwrap();
        }
        assert_eq!(store.pop_front("q", SHORT).await.unwrap(), Some("a".into()));
        assert_eq!(store.pop_front("q", SHORT).await.unwrap(), Some("b".into()));
        assert_eq!(store.pop_front("q", SHORT).await.unwrap(), Some("c".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn pop_on_empty_key_times_out_with_none() {
        let store = MemoryStore::new();
        assert_eq!(store.pop_front("q", Duration::from_secs(5)).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_pop_wakes_on_push() {
        let store = MemoryStore::new();
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.pop_front("q", Duration::from_secs(30)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.push_back("q", "late".into()).await.unwrap();

        let popped = waiter.await.unwrap().unwrap();
        assert_eq!(popped, Some("late".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn racing_pops_deliver_to_exactly_one_caller() {
        let store = MemoryStore::new();
        store.push_back("q", "only".into()).await.unwrap();

        let mut waiters = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            waiters.push(tokio::spawn(async move {
                store.pop_front("q", Duration::from_millis(200)).await.unwrap()
            }));
        }

        let mut winners = 0;
        for waiter in waiters {
            if waiter.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn put_single_overwrites_previous_record() {
        let store = MemoryStore::new();
        store.put_single("r", "first".into(), Duration::from_secs(60)).await.unwrap();
        store.put_single("r", "second".into(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.pop_front("r", SHORT).await.unwrap(), Some("second".into()));
        assert_eq!(store.pop_front("r", SHORT).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn put_single_expires_after_ttl() {
        let store = MemoryStore::new();
        store.put_single("r", "soon gone".into(), Duration::from_secs(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.pop_front("r", SHORT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_single_is_retrievable_before_ttl() {
        let store = MemoryStore::new();
        store.put_single("r", "fresh".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.pop_front("r", SHORT).await.unwrap(), Some("fresh".into()));
    }

    #[tokio::test]
    async fn queue_list_never_expires() {
        let store = MemoryStore::new();
        store.push_back("q", "patient".into()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.pop_front("q", SHORT).await.unwrap(), Some("patient".into()));
    }
}
