//! Connections and the connection factory.

use crate::database::MemoryDatabase;
use crate::error::{MemoryError, MemoryResult};
use crate::transaction::{MemoryTransaction, PendingWrite};
use async_trait::async_trait;
use txscope_core::{
    AsyncConnection, AsyncConnectionFactory, CancelSignal, Connection, ConnectionFactory,
    DriverOperation, DriverResult, IsolationLevel,
};
use uuid::Uuid;

/// Hands out [`MemoryConnection`]s on a [`MemoryDatabase`].
#[derive(Debug, Clone)]
pub struct MemoryConnectionFactory {
    db: MemoryDatabase,
}

impl MemoryConnectionFactory {
    pub(crate) fn new(db: MemoryDatabase) -> Self {
        Self { db }
    }

    /// Returns the database connections are made on.
    #[must_use]
    pub fn database(&self) -> &MemoryDatabase {
        &self.db
    }

    fn make(&self) -> MemoryResult<Option<MemoryConnection>> {
        self.db.trip(DriverOperation::MakeConnection)?;
        if self.db.take_yield_nothing() {
            tracing::debug!("connection factory yielding no connection");
            return Ok(None);
        }
        self.db.counters().connection_made();
        Ok(Some(MemoryConnection::new(self.db.clone())))
    }
}

impl ConnectionFactory for MemoryConnectionFactory {
    type Connection = MemoryConnection;

    fn make_new(&self, _cancel: &CancelSignal) -> DriverResult<Option<MemoryConnection>> {
        Ok(self.make()?)
    }
}

#[async_trait]
impl AsyncConnectionFactory for MemoryConnectionFactory {
    type Connection = MemoryConnection;

    async fn make_new(&self, _cancel: &CancelSignal) -> DriverResult<Option<MemoryConnection>> {
        tokio::task::yield_now().await;
        Ok(self.make()?)
    }
}

/// A connection to a [`MemoryDatabase`].
///
/// Data access goes through the connection. Passing `Some(transaction)` reads
/// and writes inside that transaction; passing `None` works directly on the
/// committed tables, one row at a time.
#[derive(Debug)]
pub struct MemoryConnection {
    id: Uuid,
    db: MemoryDatabase,
    open: bool,
}

impl MemoryConnection {
    fn new(db: MemoryDatabase) -> Self {
        Self {
            id: Uuid::new_v4(),
            db,
            open: false,
        }
    }

    /// Returns the connection's unique id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns true while the connection is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Inserts or replaces a row.
    ///
    /// # Errors
    ///
    /// Fails if the connection is closed or the transaction is not usable on
    /// this connection.
    pub fn insert(
        &self,
        transaction: Option<&MemoryTransaction>,
        table: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> DriverResult<()> {
        let key = key.into();
        let value = value.into();
        match self.bind(transaction)? {
            Some(tx) => tx.stage(table, key, PendingWrite::Put(value))?,
            None => self.db.with_tables_mut(|tables| {
                tables.entry(table.to_owned()).or_default().insert(key, value);
            }),
        }
        Ok(())
    }

    /// Deletes a row. Deleting a missing row is not an error.
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert).
    pub fn delete(
        &self,
        transaction: Option<&MemoryTransaction>,
        table: &str,
        key: impl Into<String>,
    ) -> DriverResult<()> {
        let key = key.into();
        match self.bind(transaction)? {
            Some(tx) => tx.stage(table, key, PendingWrite::Delete)?,
            None => self.db.with_tables_mut(|tables| {
                if let Some(rows) = tables.get_mut(table) {
                    rows.remove(&key);
                }
            }),
        }
        Ok(())
    }

    /// Reads a row.
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert).
    pub fn get(
        &self,
        transaction: Option<&MemoryTransaction>,
        table: &str,
        key: &str,
    ) -> DriverResult<Option<String>> {
        Ok(match self.bind(transaction)? {
            Some(tx) => tx.read(table, key)?,
            None => self.db.get(table, key),
        })
    }

    /// Lists the keys of a table in order.
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert).
    pub fn keys(
        &self,
        transaction: Option<&MemoryTransaction>,
        table: &str,
    ) -> DriverResult<Vec<String>> {
        Ok(match self.bind(transaction)? {
            Some(tx) => tx.keys(table)?,
            None => self.db.keys(table),
        })
    }

    fn bind<'t>(
        &self,
        transaction: Option<&'t MemoryTransaction>,
    ) -> MemoryResult<Option<&'t MemoryTransaction>> {
        if !self.open {
            return Err(MemoryError::ConnectionClosed);
        }
        match transaction {
            Some(tx) if tx.connection_id() != self.id => Err(MemoryError::ForeignTransaction),
            other => Ok(other),
        }
    }

    fn do_open(&mut self) -> MemoryResult<()> {
        if self.open {
            return Err(MemoryError::ConnectionAlreadyOpen);
        }
        self.db.trip(DriverOperation::Open)?;
        self.open = true;
        self.db.counters().opened();
        tracing::trace!(connection = %self.id, "memory connection opened");
        Ok(())
    }

    fn do_close(&mut self) -> MemoryResult<()> {
        if !self.open {
            return Ok(());
        }
        self.db.trip(DriverOperation::Close)?;
        self.open = false;
        self.db.counters().closed();
        tracing::trace!(connection = %self.id, "memory connection closed");
        Ok(())
    }

    fn do_begin(&mut self, isolation: IsolationLevel) -> MemoryResult<MemoryTransaction> {
        if !self.open {
            return Err(MemoryError::ConnectionClosed);
        }
        self.db.trip(DriverOperation::BeginTransaction)?;
        let tx = MemoryTransaction::new(self.db.clone(), self.id, isolation);
        self.db.counters().begun();
        tracing::trace!(
            connection = %self.id,
            transaction = %tx.id(),
            ?isolation,
            "memory transaction begun"
        );
        Ok(tx)
    }
}

impl Connection for MemoryConnection {
    type Transaction = MemoryTransaction;

    fn open(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        Ok(self.do_open()?)
    }

    fn close(&mut self) -> DriverResult<()> {
        Ok(self.do_close()?)
    }

    fn begin_transaction(
        &mut self,
        isolation: IsolationLevel,
        _cancel: &CancelSignal,
    ) -> DriverResult<MemoryTransaction> {
        Ok(self.do_begin(isolation)?)
    }
}

#[async_trait]
impl AsyncConnection for MemoryConnection {
    type Transaction = MemoryTransaction;

    async fn open(&mut self, cancel: &CancelSignal) -> DriverResult<()> {
        tokio::task::yield_now().await;
        if cancel.is_cancelled() {
            return Err(MemoryError::Cancelled.into());
        }
        Ok(self.do_open()?)
    }

    async fn close(&mut self) -> DriverResult<()> {
        tokio::task::yield_now().await;
        Ok(self.do_close()?)
    }

    async fn begin_transaction(
        &mut self,
        isolation: IsolationLevel,
        cancel: &CancelSignal,
    ) -> DriverResult<MemoryTransaction> {
        tokio::task::yield_now().await;
        if cancel.is_cancelled() {
            return Err(MemoryError::Cancelled.into());
        }
        Ok(self.do_begin(isolation)?)
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if self.open {
            self.db.counters().released();
            tracing::trace!(connection = %self.id, "memory connection dropped while open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_connection(db: &MemoryDatabase) -> MemoryConnection {
        let mut conn = ConnectionFactory::make_new(&db.connection_factory(), &CancelSignal::new())
            .unwrap()
            .unwrap();
        Connection::open(&mut conn, &CancelSignal::new()).unwrap();
        conn
    }

    #[test]
    fn closed_connection_rejects_access() {
        let db = MemoryDatabase::new();
        let conn = ConnectionFactory::make_new(&db.connection_factory(), &CancelSignal::new())
            .unwrap()
            .unwrap();

        assert!(!conn.is_open());
        assert!(conn.get(None, "things", "a").is_err());
        assert!(conn.insert(None, "things", "a", "1").is_err());
    }

    #[test]
    fn autocommit_writes_land_immediately() {
        let db = MemoryDatabase::new();
        let conn = open_connection(&db);

        conn.insert(None, "things", "a", "1").unwrap();
        assert_eq!(db.get("things", "a").as_deref(), Some("1"));

        conn.delete(None, "things", "a").unwrap();
        conn.delete(None, "things", "missing").unwrap();
        assert!(db.is_empty("things"));
    }

    #[test]
    fn transactional_writes_wait_for_commit() {
        let db = MemoryDatabase::new();
        let cancel = CancelSignal::new();
        let mut conn = open_connection(&db);
        let mut tx = Connection::begin_transaction(&mut conn, IsolationLevel::Serializable, &cancel)
            .unwrap();

        conn.insert(Some(&tx), "things", "a", "1").unwrap();
        assert_eq!(conn.get(Some(&tx), "things", "a").unwrap().as_deref(), Some("1"));
        assert_eq!(conn.get(None, "things", "a").unwrap(), None);

        txscope_core::Transaction::commit(&mut tx, &cancel).unwrap();
        assert_eq!(conn.keys(None, "things").unwrap(), vec!["a"]);
        assert_eq!(tx.isolation_level(), IsolationLevel::Serializable);
    }

    #[test]
    fn transaction_is_bound_to_its_connection() {
        let db = MemoryDatabase::new();
        let cancel = CancelSignal::new();
        let mut first = open_connection(&db);
        let second = open_connection(&db);
        let tx = Connection::begin_transaction(&mut first, IsolationLevel::default(), &cancel)
            .unwrap();

        assert!(second.insert(Some(&tx), "things", "a", "1").is_err());
    }

    #[test]
    fn open_close_are_counted() {
        let db = MemoryDatabase::new();
        let mut conn = open_connection(&db);
        assert!(Connection::open(&mut conn, &CancelSignal::new()).is_err());
        assert_eq!(db.stats().live_connections, 1);

        Connection::close(&mut conn).unwrap();
        Connection::close(&mut conn).unwrap();
        let stats = db.stats();
        assert_eq!((stats.opens, stats.closes, stats.live_connections), (1, 1, 0));
    }

    #[test]
    fn dropping_open_connection_releases_it() {
        let db = MemoryDatabase::new();
        drop(open_connection(&db));

        let stats = db.stats();
        assert_eq!(stats.closes, 0);
        assert_eq!(stats.live_connections, 0);
    }

    #[test]
    fn factory_can_yield_nothing() {
        let db = MemoryDatabase::new();
        let factory = db.connection_factory();
        db.yield_no_connection();

        assert!(ConnectionFactory::make_new(&factory, &CancelSignal::new())
            .unwrap()
            .is_none());
        assert!(ConnectionFactory::make_new(&factory, &CancelSignal::new())
            .unwrap()
            .is_some());
        assert_eq!(db.stats().connections_made, 1);
    }

    #[test]
    fn injected_open_fault_leaves_connection_closed() {
        let db = MemoryDatabase::new();
        db.inject_fault(DriverOperation::Open);
        let mut conn = ConnectionFactory::make_new(&db.connection_factory(), &CancelSignal::new())
            .unwrap()
            .unwrap();

        assert!(Connection::open(&mut conn, &CancelSignal::new()).is_err());
        assert!(!conn.is_open());
        Connection::open(&mut conn, &CancelSignal::new()).unwrap();
    }

    #[tokio::test]
    async fn async_begin_honours_cancellation() {
        let db = MemoryDatabase::new();
        let cancel = CancelSignal::new();
        let mut conn = AsyncConnectionFactory::make_new(&db.connection_factory(), &cancel)
            .await
            .unwrap()
            .unwrap();
        AsyncConnection::open(&mut conn, &cancel).await.unwrap();

        cancel.cancel();
        let begun =
            AsyncConnection::begin_transaction(&mut conn, IsolationLevel::default(), &cancel).await;
        assert!(begun.is_err());
        AsyncConnection::close(&mut conn).await.unwrap();
        assert_eq!(db.stats().transactions_begun, 0);
    }
}
