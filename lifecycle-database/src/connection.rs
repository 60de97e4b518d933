use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lifecycle_common::{ContextError, LifecycleContext};
use serde_derive::{Deserialize, Serialize};
use tokio::sync::{RwLock, Semaphore, SemaphorePermit};
use tracing::{debug, info};

use crate::error::{ConnectError, DatabaseError};

/// Connecting to this URL is always refused.
pub const FAILURE_URL: &str = "mock://fail";
/// Connecting to this URL never completes, so the attempt runs into its timeout.
pub const UNRESPONSIVE_URL: &str = "mock://unresponsive";

const HANDSHAKE_LATENCY: Duration = Duration::from_millis(10);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

struct Records {
    users: Vec<User>,
    next_id: u64,
}

impl Records {
    fn seeded() -> Self {
        let users = vec![
            User {
                id: 1,
                name: "Alice".to_owned(),
                email: "alice@example.com".to_owned(),
            },
            User {
                id: 2,
                name: "Bob".to_owned(),
                email: "bob@example.com".to_owned(),
            },
        ];
        Self { users, next_id: 3 }
    }
}

/// An in-memory stand-in for a database connection pool.
///
/// Live from a successful [`connect`](MockConnection::connect) until
/// [`close`](MockConnection::close); every operation fails with
/// [`DatabaseError::NotConnected`] afterwards. At most `max_connections`
/// operations run at once.
pub struct MockConnection {
    url: String,
    max_connections: u32,
    connected: AtomicBool,
    permits: Semaphore,
    records: RwLock<Records>,
}

impl MockConnection {
    /// Establish a connection, giving up after `timeout` or once `ctx` is done.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        timeout: Duration,
        ctx: &LifecycleContext,
    ) -> Result<Self, ConnectError> {
        let attempt = ctx.with_timeout(timeout);
        match attempt.run(handshake(url)).await {
            Ok(result) => result.map(|()| Self::open(url, max_connections)),
            Err(ContextError::DeadlineExceeded) => Err(ConnectError::Timeout {
                url: url.to_owned(),
                timeout,
            }),
            Err(ContextError::Cancelled) => Err(ConnectError::Cancelled {
                url: url.to_owned(),
            }),
        }
    }

    fn open(url: &str, max_connections: u32) -> Self {
        Self {
            url: url.to_owned(),
            max_connections,
            connected: AtomicBool::new(true),
            permits: Semaphore::new(max_connections as usize),
            records: RwLock::new(Records::seeded()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Liveness check; answers even while every permit is held.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        if !self.is_connected() {
            return Err(DatabaseError::NotConnected);
        }
        Ok(())
    }

    pub async fn users(&self) -> Result<Vec<User>, DatabaseError> {
        let _permit = self.acquire().await?;
        Ok(self.records.read().await.users.clone())
    }

    pub async fn create_user(&self, name: &str, email: &str) -> Result<User, DatabaseError> {
        let _permit = self.acquire().await?;
        let mut records = self.records.write().await;

        let user = User {
            id: records.next_id,
            name: name.to_owned(),
            email: email.to_owned(),
        };
        records.next_id += 1;
        records.users.push(user.clone());

        debug!(user_id = user.id, "user created");
        Ok(user)
    }

    /// Mark the connection closed. Closing twice is a no-op. Operations waiting
    /// for capacity are woken and fail with `NotConnected`.
    pub async fn close(&self) -> Result<(), DatabaseError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.permits.close();
            info!(url = %self.url, "mock database connection closed");
        }
        Ok(())
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, DatabaseError> {
        if !self.is_connected() {
            return Err(DatabaseError::NotConnected);
        }
        self.permits
            .acquire()
            .await
            .map_err(|_| DatabaseError::NotConnected)
    }
}

async fn handshake(url: &str) -> Result<(), ConnectError> {
    if url == UNRESPONSIVE_URL {
        std::future::pending::<()>().await;
    }

    tokio::time::sleep(HANDSHAKE_LATENCY).await;

    if url == FAILURE_URL {
        return Err(ConnectError::Refused {
            url: url.to_owned(),
        });
    }
    Ok(())
}
