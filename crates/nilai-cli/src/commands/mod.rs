//! Command handlers

pub mod config;
pub mod import;
pub mod label;
pub mod mark;
pub mod status;
pub mod tag;
