//! Test helpers para kestrel-server.

#![allow(dead_code, unused_imports)]

pub mod app;
pub mod client;

pub use app::{START_MS, TestApp, test_app, test_app_with};
pub use client::{TestClient, TestResponse};
