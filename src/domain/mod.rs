//! Core domain types and logic.

pub mod account;
pub mod backtest;
pub mod calendar;
pub mod cancel;
pub mod compare;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod indicator_helpers;
pub mod metrics;
pub mod portfolio;
pub mod price;
pub mod service;
pub mod strategy;
pub mod symbol_data;
pub mod trade;
