/// Tests that exercise the engine end to end: concurrent migrators, a real
/// PostgreSQL server and the `vpc` binary
pub mod cli;
pub mod engine_concurrency;
pub mod postgres_engine;
