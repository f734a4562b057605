//! End-to-end ingest pipeline tests against a wiremock upstream and a
//! sqlx-managed Postgres database.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use oppradar_core::{AppConfig, Classification, Environment};
use oppradar_db::{
    create_source, get_source, list_recent_scrape_logs, list_unresolved_posts, NewSource,
};
use oppradar_ingest::{run_ingest, IngestClient, SourceResult};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        cron_secret: None,
        anthropic_api_key: None,
        openai_api_key: None,
        claude_model: "claude-sonnet-4-20250514".to_string(),
        openai_model: "gpt-4o".to_string(),
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        ingest_request_timeout_secs: 5,
        ingest_user_agent: "oppradar-test/0.1".to_string(),
        ingest_hn_item_limit: 30,
        ingest_inter_source_delay_ms: 0,
        analyze_default_limit: 10,
        analyze_overfetch_factor: 3,
        analyze_inter_call_delay_ms: 0,
        analyze_request_timeout_secs: 5,
    }
}

async fn create_reddit_source(pool: &sqlx::PgPool, subreddit: &str) -> i64 {
    create_source(
        pool,
        &NewSource {
            platform: "reddit".to_string(),
            identifier: subreddit.to_string(),
            display_name: format!("r/{subreddit}"),
            scrape_frequency_hours: 6,
        },
    )
    .await
    .expect("create reddit source")
    .id
}

async fn create_hn_source(pool: &sqlx::PgPool, kind: &str) -> i64 {
    create_source(
        pool,
        &NewSource {
            platform: "hackernews".to_string(),
            identifier: kind.to_string(),
            display_name: format!("HN {kind}"),
            scrape_frequency_hours: 6,
        },
    )
    .await
    .expect("create hn source")
    .id
}

const REDDIT_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <author><name>/u/alice</name></author>
    <id>t3_aaa111</id>
    <link href="https://www.reddit.com/r/startups/comments/aaa111/x/" />
    <updated>2025-08-10T12:30:00+00:00</updated>
    <title>Is there a tool that syncs invoices to my bank?</title>
    <content type="html">&lt;p&gt;Manually doing this every month.&lt;/p&gt;</content>
  </entry>
  <entry>
    <author><name>/u/bob</name></author>
    <id>t3_bbb222</id>
    <link href="https://www.reddit.com/r/startups/comments/bbb222/y/" />
    <updated>2025-08-10T11:00:00+00:00</updated>
    <title>Happy Friday everyone</title>
    <content type="html">&lt;p&gt;Have a nice weekend.&lt;/p&gt;</content>
  </entry>
  <entry>
    <author><name>/u/carol</name></author>
    <id>t3_ccc333</id>
    <link href="https://www.reddit.com/r/startups/comments/ccc333/z/" />
    <updated>2025-08-10T10:00:00+00:00</updated>
    <title>Struggling with churn reporting</title>
    <content type="html">&lt;p&gt;Any alternatives to spreadsheets?&lt;/p&gt;</content>
  </entry>
</feed>"#;

#[sqlx::test(migrations = "../../migrations")]
async fn reddit_pass_stores_posts_and_classifies(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/startups/new.rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REDDIT_FEED))
        .mount(&server)
        .await;

    let source_id = create_reddit_source(&pool, "startups").await;
    let client = IngestClient::with_base_urls(reqwest::Client::new(), &server.uri(), &server.uri());
    let config = test_config("unused");

    let outcomes = run_ingest(&pool, &client, &config).await.expect("ingest");

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0].result,
        SourceResult::Completed {
            posts_found: 3,
            posts_new: 3
        }
    ));

    // 2 of 3 entries carry signal markers; the third is stored rejected.
    let backlog = list_unresolved_posts(&pool, 10).await.expect("backlog");
    assert_eq!(backlog.len(), 2);
    assert!(backlog
        .iter()
        .all(|p| p.classification() == Classification::Pending));

    let source = get_source(&pool, source_id).await.expect("source");
    assert!(source.last_scraped_at.is_some());

    let logs = list_recent_scrape_logs(&pool, 10).await.expect("logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].posts_found, 3);
    assert_eq!(logs[0].posts_new, 3);
    assert!(logs[0].completed_at.is_some());
    assert!(logs[0].error_message.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn repeat_pass_is_idempotent_and_skips_until_due(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/startups/new.rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REDDIT_FEED))
        .mount(&server)
        .await;

    create_reddit_source(&pool, "startups").await;
    let client = IngestClient::with_base_urls(reqwest::Client::new(), &server.uri(), &server.uri());
    let config = test_config("unused");

    run_ingest(&pool, &client, &config).await.expect("first pass");

    // Second pass: the source was just scraped, so it is not due.
    let outcomes = run_ingest(&pool, &client, &config).await.expect("second pass");
    assert!(matches!(outcomes[0].result, SourceResult::Skipped { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn hackernews_ask_stories_bypass_filter(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/askstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([101, 102])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/item/101.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 101,
            "title": "Ask HN: How do you track small expenses?",
            "text": "Everything I found is overkill.",
            "by": "dan",
            "time": 1_723_291_800,
            "score": 55,
            "descendants": 23
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/item/102.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 102,
            "title": "Completely unrelated musing",
            "by": "erin",
            "time": 1_723_291_900,
            "score": 3,
            "descendants": 0
        })))
        .mount(&server)
        .await;

    create_hn_source(&pool, "ask").await;
    let client = IngestClient::with_base_urls(reqwest::Client::new(), &server.uri(), &server.uri());
    let config = test_config("unused");

    let outcomes = run_ingest(&pool, &client, &config).await.expect("ingest");
    assert!(matches!(
        outcomes[0].result,
        SourceResult::Completed {
            posts_found: 2,
            posts_new: 2
        }
    ));

    // Ask listings always enter the backlog, signal or not.
    let backlog = list_unresolved_posts(&pool, 10).await.expect("backlog");
    assert_eq!(backlog.len(), 2);
    assert_eq!(backlog[0].external_id, "101");
    assert_eq!(backlog[0].score, 55);
}

#[sqlx::test(migrations = "../../migrations")]
async fn failing_source_is_isolated_and_logged(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/broken/new.rss"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/startups/new.rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REDDIT_FEED))
        .mount(&server)
        .await;

    create_reddit_source(&pool, "broken").await;
    create_reddit_source(&pool, "startups").await;
    let client = IngestClient::with_base_urls(reqwest::Client::new(), &server.uri(), &server.uri());
    let config = test_config("unused");

    let outcomes = run_ingest(&pool, &client, &config).await.expect("ingest");
    assert_eq!(outcomes.len(), 2);

    let failed = outcomes
        .iter()
        .find(|o| o.source == "r/broken")
        .expect("broken outcome");
    assert!(matches!(failed.result, SourceResult::Failed { .. }));

    let succeeded = outcomes
        .iter()
        .find(|o| o.source == "r/startups")
        .expect("startups outcome");
    assert!(matches!(succeeded.result, SourceResult::Completed { .. }));

    let logs = list_recent_scrape_logs(&pool, 10).await.expect("logs");
    let failed_log = logs
        .iter()
        .find(|l| l.display_name == "r/broken")
        .expect("failed log");
    assert!(failed_log.error_message.is_some());
    assert!(failed_log.completed_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn unsupported_platform_is_skipped(pool: sqlx::PgPool) {
    create_source(
        &pool,
        &NewSource {
            platform: "other".to_string(),
            identifier: "somewhere".to_string(),
            display_name: "Somewhere".to_string(),
            scrape_frequency_hours: 6,
        },
    )
    .await
    .expect("create source");

    let client =
        IngestClient::with_base_urls(reqwest::Client::new(), "http://unused", "http://unused");
    let config = test_config("unused");

    let outcomes = run_ingest(&pool, &client, &config).await.expect("ingest");
    assert!(matches!(outcomes[0].result, SourceResult::Skipped { .. }));
    assert!(list_recent_scrape_logs(&pool, 10)
        .await
        .expect("logs")
        .is_empty());
}
