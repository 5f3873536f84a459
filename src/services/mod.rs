// src/services/mod.rs

pub mod arbiter;
pub mod catalog;
pub mod ledger;
pub mod ranking;
pub mod renderer;
pub mod score_store;
