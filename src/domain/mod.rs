//! Core domain types and logic.

pub mod candle;
pub mod indicator;
pub mod condition;
pub mod condition_parser;
pub mod condition_eval;
pub mod composite;
pub mod risk;
pub mod position;
pub mod execution;
pub mod backtest;
pub mod metrics;
pub mod strategy;
pub mod config_validation;
pub mod error;
