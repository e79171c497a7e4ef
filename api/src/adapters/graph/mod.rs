//! Microsoft Graph adapter

pub mod client;

pub use client::GraphClientImpl;
