// Integration tests for vpc

pub mod helpers;
pub mod integration;
pub mod unit;
