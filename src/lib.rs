//! Thin client layer over a hosted Supabase backend: environment
//! configuration, a shared client handle, auth and database helpers with
//! uniform result shapes, and a connection check that exercises the wiring.
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod diag;
pub mod model;
pub mod query;
pub mod storage;
