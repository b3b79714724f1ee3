use insta_crawler::config::DEFAULT_USER_AGENT;
use insta_crawler::feed::{self, RunOutcome};
use insta_crawler::{
    Authenticator, CrawlConfig, CrawlerError, Endpoints, ErrorKind, InstaCrawler, PostSource,
    Session,
};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROFILE_PATH: &str = "/api/v1/users/web_profile_info/";
const GRAPHQL_PATH: &str = "/graphql/query/";

fn node(code: &str, ts: i64, caption: Option<&str>) -> Value {
    let caption_edges = match caption {
        Some(text) => json!([{ "node": { "text": text } }]),
        None => json!([]),
    };
    json!({
        "node": {
            "shortcode": code,
            "taken_at_timestamp": ts,
            "display_url": format!("https://cdn.example/{}.jpg", code),
            "is_video": false,
            "edge_media_preview_like": { "count": 5 },
            "edge_media_to_comment": { "count": 1 },
            "edge_media_to_caption": { "edges": caption_edges }
        }
    })
}

fn page_info(end_cursor: Option<&str>) -> Value {
    json!({ "has_next_page": end_cursor.is_some(), "end_cursor": end_cursor })
}

fn profile_body(is_private: bool, edges: Vec<Value>, end_cursor: Option<&str>) -> Value {
    json!({
        "data": {
            "user": {
                "id": "42",
                "username": "someone",
                "full_name": "Some One",
                "is_private": is_private,
                "followed_by_viewer": false,
                "edge_followed_by": { "count": 1200 },
                "edge_follow": { "count": 80 },
                "edge_owner_to_timeline_media": {
                    "count": 3,
                    "page_info": page_info(end_cursor),
                    "edges": edges
                }
            }
        },
        "status": "ok"
    })
}

fn page_body(edges: Vec<Value>, end_cursor: Option<&str>) -> Value {
    json!({
        "data": {
            "user": {
                "edge_owner_to_timeline_media": {
                    "count": 3,
                    "page_info": page_info(end_cursor),
                    "edges": edges
                }
            }
        },
        "status": "ok"
    })
}

fn crawler(server: &MockServer) -> InstaCrawler {
    InstaCrawler::new(DEFAULT_USER_AGENT)
        .unwrap()
        .with_endpoints(Endpoints::single(server.uri()))
}

async fn mount_home(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "csrftoken=tok; Path=/"),
        )
        .mount(server)
        .await;
}

async fn mount_profile(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(query_param("username", "someone"))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn loads_profile_metadata() {
    let server = MockServer::start().await;
    mount_profile(
        &server,
        ResponseTemplate::new(200).set_body_json(profile_body(false, vec![], None)),
    )
    .await;

    let profile = crawler(&server).get_profile("someone").await.unwrap();
    assert_eq!(profile.id, "42");
    assert_eq!(profile.to_string(), "someone (Some One)");
    assert_eq!(profile.followers, 1200);
    assert_eq!(profile.followees, 80);

    let mut out = Vec::new();
    feed::print_profile(&mut out, &profile).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with(
        "Profile loaded: someone (Some One)\nFollowers: 1200, Following: 80\nPosts: 3\n"
    ));
}

#[tokio::test]
async fn missing_profile_is_not_found() {
    let server = MockServer::start().await;
    mount_profile(&server, ResponseTemplate::new(404)).await;

    let err = crawler(&server).get_profile("someone").await.unwrap_err();
    assert!(matches!(err, CrawlerError::ProfileNotFound(name) if name == "someone"));
}

#[tokio::test]
async fn unauthorized_means_login_required() {
    let server = MockServer::start().await;
    mount_profile(
        &server,
        ResponseTemplate::new(401)
            .set_body_json(json!({ "require_login": true, "status": "fail" })),
    )
    .await;

    let err = crawler(&server).get_profile("someone").await.unwrap_err();
    assert!(matches!(err, CrawlerError::LoginRequired));
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[tokio::test]
async fn private_profile_needs_login_when_anonymous() {
    let server = MockServer::start().await;
    mount_profile(
        &server,
        ResponseTemplate::new(200).set_body_json(profile_body(true, vec![], None)),
    )
    .await;

    let err = crawler(&server).get_profile("someone").await.unwrap_err();
    assert!(matches!(err, CrawlerError::LoginRequired));

    let mut session = Session::new("me");
    session.cookies.insert("sessionid".to_string(), "abc".to_string());
    let profile = crawler(&server)
        .with_session(&session)
        .get_profile("someone")
        .await
        .unwrap();
    assert!(profile.is_private);
}

#[tokio::test]
async fn throttling_is_a_connectivity_error() {
    let server = MockServer::start().await;
    mount_profile(&server, ResponseTemplate::new(429)).await;

    let err = crawler(&server).get_profile("someone").await.unwrap_err();
    assert!(matches!(err, CrawlerError::RateLimited));
    assert_eq!(err.kind(), ErrorKind::Connectivity);

    let mut out = Vec::new();
    feed::report_fatal(&mut out, &err).unwrap();
    assert!(String::from_utf8(out)
        .unwrap()
        .starts_with("Connection error: "));
}

#[tokio::test]
async fn session_cookies_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(header("cookie", "csrftoken=tok; sessionid=abc"))
        .and(header("x-csrftoken", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(false, vec![], None)))
        .mount(&server)
        .await;

    let mut session = Session::new("me");
    session.cookies.insert("sessionid".to_string(), "abc".to_string());
    session.cookies.insert("csrftoken".to_string(), "tok".to_string());
    let crawler = crawler(&server).with_session(&session);
    assert!(crawler.is_authenticated());
    crawler.get_profile("someone").await.unwrap();
}

#[tokio::test]
async fn posts_are_fetched_lazily_across_pages() {
    let server = MockServer::start().await;
    mount_profile(
        &server,
        ResponseTemplate::new(200).set_body_json(profile_body(
            false,
            vec![node("A", 1742289240, Some("first")), node("B", 1742289000, None)],
            Some("cursor-1"),
        )),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(GRAPHQL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(vec![node("C", 1742280000, None)], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let crawler = crawler(&server);
    let profile = crawler.get_profile("someone").await.unwrap();
    let mut posts = crawler.posts(&profile);

    let mut codes = Vec::new();
    while let Some(post) = posts.next_post().await {
        codes.push(post.unwrap().shortcode);
    }
    assert_eq!(codes, ["A", "B", "C"]);
}

#[tokio::test]
async fn failed_page_is_requested_again() {
    let server = MockServer::start().await;
    mount_profile(
        &server,
        ResponseTemplate::new(200).set_body_json(profile_body(
            false,
            vec![node("A", 1742289240, None)],
            Some("cursor-1"),
        )),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(GRAPHQL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(vec![node("B", 1742280000, None)], None)),
        )
        .mount(&server)
        .await;

    let crawler = crawler(&server);
    let profile = crawler.get_profile("someone").await.unwrap();
    let mut posts = crawler.posts(&profile);

    assert_eq!(posts.next_post().await.unwrap().unwrap().shortcode, "A");
    let err = posts.next_post().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert_eq!(posts.next_post().await.unwrap().unwrap().shortcode, "B");
    assert!(posts.next_post().await.is_none());
}

#[tokio::test]
async fn page_that_keeps_failing_ends_the_sequence() {
    let server = MockServer::start().await;
    mount_profile(
        &server,
        ResponseTemplate::new(200).set_body_json(profile_body(
            false,
            vec![node("A", 1742289240, None)],
            Some("cursor-1"),
        )),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let crawler = crawler(&server);
    let profile = crawler.get_profile("someone").await.unwrap();
    let config = CrawlConfig::new("someone").with_max_page_failures(3);
    let mut posts = crawler.posts_with_config(&profile, &config);

    assert_eq!(posts.next_post().await.unwrap().unwrap().shortcode, "A");
    for _ in 0..2 {
        let err = posts.next_post().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }
    let err = posts.next_post().await.unwrap().unwrap_err();
    assert!(matches!(err, CrawlerError::TooManyFailures(3)));
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(posts.next_post().await.is_none());
}

#[tokio::test]
async fn report_loop_aborts_when_page_keeps_failing() {
    let server = MockServer::start().await;
    mount_profile(
        &server,
        ResponseTemplate::new(200).set_body_json(profile_body(
            false,
            vec![node("A", 1742289240, None)],
            Some("cursor-1"),
        )),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(GRAPHQL_PATH))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "status": "fail", "message": "" })),
        )
        .mount(&server)
        .await;

    let crawler = crawler(&server);
    let profile = crawler.get_profile("someone").await.unwrap();
    let config = CrawlConfig::new("someone")
        .with_item_delay(Duration::ZERO)
        .with_max_page_failures(4);
    let mut posts = crawler.posts_with_config(&profile, &config);

    let mut out = Vec::new();
    let err = feed::run(&mut posts, &config, &mut out).await.unwrap_err();
    let out = String::from_utf8(out).unwrap();

    assert!(matches!(err, CrawlerError::TooManyFailures(4)));
    assert!(out.contains("Post 1:"));
    assert_eq!(out.matches("Error processing post: ").count(), 3);
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 1 + 4);
}

#[tokio::test]
async fn report_loop_over_network_source() {
    let server = MockServer::start().await;
    mount_profile(
        &server,
        ResponseTemplate::new(200).set_body_json(profile_body(
            false,
            vec![node("A", 1742289240, Some("hello")), node("B", 1742289000, None)],
            None,
        )),
    )
    .await;

    let crawler = crawler(&server);
    let profile = crawler.get_profile("someone").await.unwrap();
    let mut posts = crawler.posts(&profile);
    let config = CrawlConfig::new("someone").with_item_delay(Duration::ZERO);

    let mut out = Vec::new();
    let summary = feed::run(&mut posts, &config, &mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(summary.reported, 2);
    assert_eq!(summary.outcome, RunOutcome::Exhausted);
    assert!(out.contains("URL: https://www.instagram.com/p/A/\nDate: 2025-03-18 09:14:00\n"));
    assert!(out.contains("Caption: hello\n"));
    assert!(out.contains("Caption: No caption\n"));
}

#[tokio::test]
async fn login_collects_session_cookies() {
    let server = MockServer::start().await;
    mount_home(&server).await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/ajax/"))
        .and(header("x-csrftoken", "tok"))
        .and(body_string_contains("username=me"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "sessionid=s3cr3t; Path=/; HttpOnly")
                .set_body_json(json!({ "authenticated": true, "user": true, "status": "ok" })),
        )
        .mount(&server)
        .await;

    let session = crawler(&server).login("me", "hunter2").await.unwrap();
    assert_eq!(session.username, "me");
    assert_eq!(session.csrf_token(), Some("tok"));
    assert_eq!(session.cookies.get("sessionid").map(String::as_str), Some("s3cr3t"));
}

#[tokio::test]
async fn wrong_password_fails_login() {
    let server = MockServer::start().await;
    mount_home(&server).await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/ajax/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "authenticated": false, "user": true, "status": "ok" })),
        )
        .mount(&server)
        .await;

    let err = crawler(&server).login("me", "nope").await.unwrap_err();
    assert!(matches!(err, CrawlerError::LoginFailed(msg) if msg.contains("wrong password")));
}

#[tokio::test]
async fn two_factor_is_reported() {
    let server = MockServer::start().await;
    mount_home(&server).await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/ajax/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "two_factor_required": true, "status": "fail" })),
        )
        .mount(&server)
        .await;

    let err = crawler(&server).login("me", "pw").await.unwrap_err();
    assert!(matches!(err, CrawlerError::TwoFactorRequired(_)));
}
