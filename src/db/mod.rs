//! Database layer - connector seam to the SQL server and DDL generation

pub mod connector;
pub mod ddl;

pub use connector::{Connector, DdlConnection, SqlxConnector};
