//! Redis-backed remote store.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::script::AtomicScript;
use crate::traits::{RemoteStore, check_arity};

/// A store talking to a Redis server through a reconnecting connection
/// manager.
///
/// The connection manager is cheap to clone and multiplexes commands, so
/// every operation clones it instead of holding a pool.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    url: String,
    compare_and_delete: redis::Script,
    compare_and_expire: redis::Script,
}

impl RedisStore {
    /// Connects to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        info!(url = %url, "Connected to Redis");

        Ok(Self {
            conn,
            url: url.to_string(),
            compare_and_delete: redis::Script::new(AtomicScript::CompareAndDelete.source()),
            compare_and_expire: redis::Script::new(AtomicScript::CompareAndExpire.source()),
        })
    }

    /// Returns the URL this store is connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn script(&self, script: AtomicScript) -> &redis::Script {
        match script {
            AtomicScript::CompareAndDelete => &self.compare_and_delete,
            AtomicScript::CompareAndExpire => &self.compare_and_expire,
        }
    }
}

/// Redis rejects a zero expiry, so round sub-millisecond TTLs up.
fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        // SET NX replies OK on success and nil when the key exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn eval_atomic(
        &self,
        script: AtomicScript,
        keys: &[&str],
        args: &[&str],
    ) -> Result<i64, StoreError> {
        check_arity(script, keys, args)?;

        let mut invocation = self.script(script).prepare_invoke();
        for key in keys {
            invocation.key(*key);
        }
        for arg in args {
            invocation.arg(*arg);
        }

        let mut conn = self.conn.clone();
        let result: i64 = invocation.invoke_async(&mut conn).await?;
        debug!(script = %script, result, "Evaluated atomic script");
        Ok(result)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.conn.clone();
        // -2: missing key, -1: no expiry.
        let millis: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok((millis >= 0).then(|| Duration::from_millis(millis as u64)))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::unavailable(format!("unexpected PING reply: {pong}")))
        }
    }

    fn name(&self) -> &str {
        "redis"
    }
}
