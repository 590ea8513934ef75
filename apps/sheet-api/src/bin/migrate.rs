//! Standalone migration runner for sheet-api.
//!
//! Usage:
//!   cargo run -p sheet-api --bin sheet-migrate
//!   cargo run -p sheet-api --bin sheet-migrate -- --test
//!   cargo run -p sheet-api --bin sheet-migrate -- --revert
//!
//! Reads DATABASE_URL from the environment (or .env via dotenvy). `--test`
//! targets the `<name>_test` database; `--revert` rolls back the newest
//! applied migration instead of applying pending ones.

use std::path::Path;

use diesel::pg::PgConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

fn main() {
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let has_flag = |flag: &str| args.iter().any(|arg| arg == flag);

    let mut database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL env var is required");
    if has_flag("--test") {
        database_url = test_database_url(&database_url);
    }

    println!("Connecting to database...");
    let mut conn =
        PgConnection::establish(&database_url).expect("failed to connect to database");

    if has_flag("--revert") {
        let reverted = conn
            .revert_last_migration(MIGRATIONS)
            .expect("failed to revert migration");
        println!("Reverted: {reverted}");
        return;
    }

    println!("Running pending migrations...");
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .expect("failed to run migrations");

    if applied.is_empty() {
        println!("No pending migrations.");
        return;
    }
    for migration in &applied {
        println!("  Applied: {migration}");
    }
    println!("{} migration(s) applied.", applied.len());
}

/// `postgres://host/sheets?x=y` becomes `postgres://host/sheets_test?x=y`.
fn test_database_url(database_url: &str) -> String {
    let (base, query) = match database_url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (database_url, None),
    };
    let Some((prefix, db_name)) = base.rsplit_once('/') else {
        return database_url.to_string();
    };
    if db_name.is_empty() || db_name.ends_with("_test") {
        return database_url.to_string();
    }

    let mut url = format!("{prefix}/{db_name}_test");
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}
