//! Core modules: the ledger model, its SQLite store, the versioned-entity
//! engine and the call surface, plus the shared config and logging pieces.

pub mod action;
pub mod broker;
pub mod codec;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod rpc;
pub mod schemas;
pub mod store;
pub mod sync;
pub mod time;
pub mod trace;
