//! Checkout pool of Redis connections.
//!
//! A blocking BRPOP stalls every other command multiplexed on the same
//! connection, so each worker checks out its own connection for the duration
//! of a command. Connections are returned only after the command completes;
//! a checkout dropped mid-command (cancelled pop, error) discards the
//! connection so the server aborts the pending BRPOP instead of popping into
//! a reply nobody reads.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use redis::aio::MultiplexedConnection;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

use crate::error::{QueueError, QueueResult};

/// Bounded pool of multiplexed Redis connections.
pub struct RedisPool {
    client: redis::Client,
    idle: Mutex<Vec<MultiplexedConnection>>,
    permits: Semaphore,
    max_connections: usize,
    closed: AtomicBool,
}

impl RedisPool {
    /// Create a pool. No connection is opened until the first checkout.
    pub fn new(client: redis::Client, max_connections: usize) -> Self {
        let max_connections = max_connections.max(1);
        Self {
            client,
            idle: Mutex::new(Vec::with_capacity(max_connections)),
            permits: Semaphore::new(max_connections),
            max_connections,
            closed: AtomicBool::new(false),
        }
    }

    /// Check out a connection, opening a new one if none is idle.
    pub async fn get(&self) -> QueueResult<PooledConnection<'_>> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let permit = self.permits.acquire().await.map_err(|_| QueueError::Closed)?;

        let idle = self.take_idle();
        let conn = match idle {
            Some(conn) => conn,
            None => {
                debug!("Opening new Redis connection");
                self.client.get_multiplexed_async_connection().await?
            }
        };

        Ok(PooledConnection {
            conn,
            pool: self,
            _permit: permit,
        })
    }

    /// Close the pool. Idle connections are dropped and further checkouts fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.permits.close();
        if let Ok(mut idle) = self.idle.lock() {
            idle.clear();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of idle connections.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    fn take_idle(&self) -> Option<MultiplexedConnection> {
        self.idle.lock().ok().and_then(|mut idle| idle.pop())
    }

    fn put_back(&self, conn: MultiplexedConnection) {
        if self.is_closed() {
            return;
        }
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(conn);
        }
    }
}

/// A checked-out connection.
///
/// Call [`PooledConnection::release`] once the command has finished to make
/// the connection reusable. Dropping it without releasing discards it.
pub struct PooledConnection<'a> {
    conn: MultiplexedConnection,
    pool: &'a RedisPool,
    _permit: SemaphorePermit<'a>,
}

impl PooledConnection<'_> {
    /// Return the connection to the pool.
    pub fn release(self) {
        self.pool.put_back(self.conn);
    }
}

impl Deref for PooledConnection<'_> {
    type Target = MultiplexedConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
