// tests/integration/main.rs
#[path = "../common/mod.rs"]
mod common;

mod application_tests;
mod override_tests;
