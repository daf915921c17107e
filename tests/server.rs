//! History server exercised over real HTTP.

use serde_json::{json, Value};
use tempfile::TempDir;

use affiliate_lookup::affiliate_lookup_core::history::NewSearchHistory;
use affiliate_lookup::affiliate_lookup_core::search::SearchOutcome;
use affiliate_lookup::config::Config;
use affiliate_lookup::history::logger_from_config;
use affiliate_lookup::server::run_server;

fn test_config(tmp: &TempDir, port: u16) -> Config {
    let config_content = format!(
        r#"[db]
path = "{}/history.sqlite"

[server]
bind = "127.0.0.1:{}"

[history]
default_limit = 2
max_limit = 3
"#,
        tmp.path().display(),
        port
    );
    toml::from_str(&config_content).unwrap()
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn start_server() -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let port = find_free_port();
    let cfg = test_config(&tmp, port);
    tokio::spawn(async move {
        run_server(&cfg).await.unwrap();
    });
    wait_for_server(port).await;
    (tmp, format!("http://127.0.0.1:{}", port))
}

fn simple_entry(doc: &str) -> Value {
    json!({
        "searchType": "simple",
        "searchParams": { "documento": doc },
        "resultFound": "false",
        "resultData": null
    })
}

#[tokio::test]
async fn test_health() {
    let (_tmp, base) = start_server().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_post_returns_persisted_entry() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/search-history", base))
        .json(&json!({
            "searchType": "advanced",
            "searchParams": { "provider": "centro", "resultCount": 1 },
            "resultFound": "true",
            "resultData": { "DOC": "123" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let entry: Value = resp.json().await.unwrap();
    assert_eq!(entry["searchType"], "advanced");
    assert_eq!(entry["searchParams"]["provider"], "centro");
    assert_eq!(entry["resultFound"], "true");
    assert_eq!(entry["resultData"]["DOC"], "123");
    assert_eq!(entry["id"].as_str().unwrap().len(), 36);
    assert!(entry["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_post_invalid_bodies_are_bad_requests() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/search-history", base);

    let bad_type = json!({ "searchType": "other", "searchParams": {}, "resultFound": "true" });
    let bad_found = json!({ "searchType": "simple", "searchParams": {}, "resultFound": true });
    for body in [bad_type, bad_found] {
        let resp = client.post(&url).json(&body).send().await.unwrap();
        assert_eq!(resp.status(), 400);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["error"]["code"], "bad_request");
        assert!(err["error"]["message"].is_string());
    }

    let resp = client
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_list_newest_first_with_limit_rules() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/search-history", base);

    for doc in ["1", "2", "3", "4"] {
        let resp = client.post(&url).json(&simple_entry(doc)).send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    let docs = |entries: Vec<Value>| -> Vec<String> {
        entries
            .iter()
            .map(|e| e["searchParams"]["documento"].as_str().unwrap().to_string())
            .collect()
    };

    let default: Vec<Value> = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(docs(default), vec!["4", "3"]);

    let malformed: Vec<Value> = client
        .get(format!("{}?limit=abc", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(malformed.len(), 2);

    let clamped: Vec<Value> = client
        .get(format!("{}?limit=50", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(docs(clamped), vec!["4", "3", "2"]);

    let one: Vec<Value> = client
        .get(format!("{}?limit=1", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(docs(one), vec!["4"]);
}

#[tokio::test]
async fn test_logger_with_endpoint_posts_to_server() {
    let (_tmp, base) = start_server().await;

    let client_tmp = TempDir::new().unwrap();
    let mut cfg = test_config(&client_tmp, find_free_port());
    cfg.history.endpoint = Some(format!("{}/", base));

    let logger = logger_from_config(&cfg).await;
    assert!(logger.is_enabled());
    logger.notify(NewSearchHistory::simple("777", &SearchOutcome::NotFound));
    assert_eq!(logger.shutdown().await, 1);

    let entries: Vec<Value> = reqwest::get(format!("{}/api/search-history", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["searchType"], "simple");
    assert_eq!(entries[0]["searchParams"]["documento"], "777");
    assert_eq!(entries[0]["resultFound"], "false");
    // The endpoint took precedence over the local database.
    assert!(!client_tmp.path().join("history.sqlite").exists());
}

#[tokio::test]
async fn test_logger_with_unreachable_endpoint_drops_entries() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = test_config(&tmp, find_free_port());
    cfg.history.endpoint = Some(format!("http://127.0.0.1:{}", find_free_port()));

    let logger = logger_from_config(&cfg).await;
    assert!(logger.is_enabled());
    logger.notify(NewSearchHistory::simple("777", &SearchOutcome::NotFound));
    logger.notify(NewSearchHistory::simple("778", &SearchOutcome::NotFound));
    assert_eq!(logger.shutdown().await, 0);
}
