// crates/storefront-migrate-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Fixtures
// Description: Seeded databases and loopback servers for HTTP tests.
// Purpose: Exercise the real router over TCP with reqwest.
// Dependencies: storefront-migrate-server, reqwest, tempfile
// ============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Shared fixtures; not every test file uses every helper."
)]

use rusqlite::params;
use serde_json::Value;
use storefront_migrate_config::LogSinkKind;
use storefront_migrate_config::StorefrontMigrateConfig;
use storefront_migrate_server::MigrationServer;
use storefront_migrate_store_sqlite::SqliteDatabase;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Running loopback server and its backing database.
pub struct TestServer {
    pub dir: TempDir,
    pub base_url: String,
    pub db: SqliteDatabase,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Posts a JSON body and returns the status and parsed response.
    pub async fn post(&self, path: &str, body: &Value) -> (u16, Value) {
        let response = self.client.post(self.url(path)).json(body).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    /// Issues a GET without following redirects.
    pub async fn get(&self, path: &str) -> (u16, Option<String>, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .map(|value| value.to_str().unwrap().to_string());
        (status, location, response.json().await.unwrap())
    }

    pub fn count(&self, sql: &str) -> i64 {
        self.db
            .with_connection(|connection| Ok(connection.query_row(sql, params![], |row| row.get(0))?))
            .unwrap()
    }
}

/// Starts a server over a database seeded with `payments` published payments.
pub async fn spawn_server(payments: i64) -> TestServer {
    let dir = TempDir::new().unwrap();
    let mut config = StorefrontMigrateConfig::default();
    config.database.path = dir.path().join("shop.sqlite");
    config.migration.default_page_size = 2;
    config.migration.install_target_schema = true;
    config.logging.sink = LogSinkKind::None;

    let db = SqliteDatabase::open(&config.sqlite_config()).unwrap();
    db.install_legacy_schema().unwrap();
    seed_payments(&db, payments);

    let server = MigrationServer::from_config(&config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve_on(listener));
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    TestServer {
        dir,
        base_url: format!("http://{addr}"),
        db,
        client,
    }
}

fn seed_payments(db: &SqliteDatabase, count: i64) {
    db.with_connection(|connection| {
        let tx = connection.transaction()?;
        for id in 1..=count {
            tx.execute(
                "INSERT INTO legacy_objects (id, object_type, status, created_at, modified_at) \
                 VALUES (?1, 'edd_payment', 'publish', '2020-01-01 00:00:00', '2020-01-01 00:00:00')",
                params![id],
            )?;
            tx.execute(
                "INSERT INTO legacy_meta (object_id, meta_key, meta_value) VALUES (?1, \
                 '_edd_payment_user_email', ?2)",
                params![id, Value::from(format!("buyer{id}@example.com")).to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    })
    .unwrap();
}
