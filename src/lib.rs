//! Back office for a petroleum depot: bulk storage and sales-floor ledgers,
//! transfer forms, importer agreements, distribution orders with payments,
//! and the depot's distribution log.
pub mod config;
pub mod distribution;
pub mod distribution_record;
pub mod error;
pub mod http;
pub mod importer;
pub mod ledger;
pub mod logging;
pub mod pagination;
pub mod service;
pub mod store;
pub mod transfer;
pub mod types;
pub mod user;
pub mod utils;
