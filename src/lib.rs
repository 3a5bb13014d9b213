pub mod analyzers;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod derive;
pub mod fetch;
pub mod filter;
pub mod output;
pub mod parser;
pub mod rates;
pub mod record;
