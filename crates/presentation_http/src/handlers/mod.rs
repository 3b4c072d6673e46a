//! HTTP request handlers

pub mod common;
pub mod health;
pub mod maps;
pub mod query;
pub mod sptrans;
