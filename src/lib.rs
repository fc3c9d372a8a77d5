pub mod audit;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod definition;
pub mod error;
pub mod ledger;
pub mod remote;
