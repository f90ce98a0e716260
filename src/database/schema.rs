// Database schema definitions and migrations

pub const BASELINE_SCHEMA: &str = include_str!("../../migrations/001_baseline_schema.sql");

/// Ordered migrations applied by `Database::run_migrations`.
pub const MIGRATIONS: &[(&str, &str)] = &[("001_baseline_schema", BASELINE_SCHEMA)];
