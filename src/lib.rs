//! Bindings and tooling for the liquid-restaking contracts: embedded ABIs
//! with typed `sol!` bindings, a dynamic ABI layer for calls, transactions
//! and log filters, and typed protocol readers, writers and subscribers.

pub mod bindings;
pub mod config;
pub mod ethereum;
pub mod protocol;
pub mod server;
