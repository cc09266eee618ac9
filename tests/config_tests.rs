//! Configuration file loading tests.

use std::io::Write;
use tempfile::NamedTempFile;
use tunedeck::config::AppConfig;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_a_full_config_file() {
    let file = write_config(
        r#"{
            "server":   { "host": "127.0.0.1", "port": 9100, "threads": 2 },
            "database": { "host": "db.internal", "port": 3307, "user": "svc",
                          "password": "pw", "dbname": "tunes",
                          "pool_size": 8, "connection_timeout_secs": 5 },
            "auth":     { "secret": "top", "expire_secs": 3600, "issuer": "tunedeck-test" },
            "log":      { "level": "debug", "path": "logs/test.log" }
        }"#,
    );

    let config = AppConfig::load(file.path()).expect("load config");
    assert_eq!(config.bind_addr(), "127.0.0.1:9100");
    assert_eq!(config.server.threads, 2);
    assert_eq!(config.database.host, "db.internal");
    assert_eq!(config.database.pool_size, 8);
    assert_eq!(config.auth.expire_secs, 3600);
    assert_eq!(config.log.path.as_deref(), Some("logs/test.log"));
}

#[test]
fn missing_file_is_an_error() {
    let err = AppConfig::load("/definitely/not/here/config.json");
    assert!(err.is_err());
}

#[test]
fn invalid_json_is_an_error() {
    let file = write_config("{ not json");
    assert!(AppConfig::load(file.path()).is_err());
}

#[test]
fn unknown_keys_are_rejected() {
    let file = write_config(
        r#"{
            "database": { "password": "pw", "dbname": "d", "flavor": "spicy" },
            "auth": { "secret": "s" }
        }"#,
    );
    assert!(AppConfig::load(file.path()).is_err());
}
