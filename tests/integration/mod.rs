/// Integration tests against SQLite-backed engines
mod basic_integration;
