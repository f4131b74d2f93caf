//! In-crate unit tests for the reconciliation engine, run against mocked
//! provider and store clients (no network).
