// Library for tests to access modules

pub mod aggregation;
pub mod backfill;
pub mod config;
pub mod models;
pub mod reconcile_worker;
pub mod routes;
pub mod service;
pub mod store;
pub mod version;
