//! On-disk fixture database shared by the test modules.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use duckdb::Connection;
use tempfile::TempDir;

use crate::core::connection::ConnectionManager;

const FIXTURE_SQL: &str = "
    CREATE TABLE t (id INTEGER, name VARCHAR, score DOUBLE, active BOOLEAN, seen DATE);
    INSERT INTO t VALUES
        (1, 'alpha',   1.5,  true,  DATE '2024-01-01'),
        (2, 'beta',    NULL, false, DATE '2024-01-02'),
        (3, NULL,      3.25, NULL,  DATE '2024-01-03'),
        (4, 'delta',   4.0,  true,  NULL),
        (5, 'epsilon', 5.5,  false, DATE '2024-01-05');
    CREATE SCHEMA sales;
    CREATE TABLE sales.orders (order_id BIGINT, amount DECIMAL(10, 2));
    CREATE TABLE sales.customers (customer_id BIGINT, email VARCHAR);
";

/// Writes `acme.duckdb` (catalog `acme`) into a fresh temp dir. The writer
/// connection is closed before returning so the file can be opened read-only.
pub fn fixture() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acme.duckdb");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(FIXTURE_SQL).unwrap();
    }
    (dir, path)
}

/// A scoped connection that keeps its manager (and so the database) alive.
/// Field order matters: the connection is dropped before the manager.
pub struct FixtureConn {
    conn: Connection,
    _manager: ConnectionManager,
}

impl Deref for FixtureConn {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

pub fn open_fixture(path: &Path) -> FixtureConn {
    let manager = ConnectionManager::open(path).unwrap();
    FixtureConn {
        conn: manager.acquire().unwrap(),
        _manager: manager,
    }
}
