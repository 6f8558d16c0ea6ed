// PostgreSQL backend - drives tokio-postgres connections through the driver seam
//
// - config: connector construction and tokio-postgres configuration
// - connection: the non-blocking handle owned by a pool slot
// - query: conversion of simple-query messages into result objects

pub mod config;
pub mod connection;
pub mod query;

pub use config::PgConnector;
pub use connection::PgConnection;
