pub mod connection;
pub mod cursor;
pub mod dispatch;
pub mod limits;
pub mod materialize;
pub mod query;
pub mod types;

#[cfg(test)]
pub mod testing;
