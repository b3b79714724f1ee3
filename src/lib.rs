use async_trait::async_trait;
use reqwest::{
    header::{COOKIE, REFERER, SET_COOKIE},
    Client, RequestBuilder, Response, StatusCode,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod retry;
pub mod session;
pub mod source;
pub mod utils;

pub use config::CrawlConfig;
pub use error::{CrawlerError, ErrorKind};
pub use models::{Post, PostPage, Profile};
pub use session::{Authenticator, Session, SessionStore};
pub use source::{PostSource, ProfilePosts, StaticPosts};

const APP_ID: &str = "936619743392459";
const POSTS_QUERY_HASH: &str = "003056d32c2554def87228bc3fd9668a";
const POSTS_PER_PAGE: u32 = 12;

/// Base URLs of the web and private API hosts.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub web: String,
    pub api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            web: "https://www.instagram.com".to_string(),
            api: "https://i.instagram.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Serve both hosts from one base URL.
    pub fn single(base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            web: base.clone(),
            api: base,
        }
    }
}

pub struct InstaCrawler {
    client: Client,
    endpoints: Endpoints,
    cookies_string: String,
    csrf_token: Option<String>,
    authenticated: bool,
}

impl InstaCrawler {
    pub fn new(user_agent: &str) -> Result<InstaCrawler, CrawlerError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(InstaCrawler {
            client,
            endpoints: Endpoints::default(),
            cookies_string: String::new(),
            csrf_token: None,
            authenticated: false,
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_session(mut self, session: &Session) -> Self {
        self.cookies_string = session.cookie_header();
        self.csrf_token = session.csrf_token().map(str::to_string);
        self.authenticated = session.is_authenticated();
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.decorate(self.client.get(url))
    }

    fn decorate(&self, mut request: RequestBuilder) -> RequestBuilder {
        request = request
            .header("X-IG-App-ID", APP_ID)
            .header(REFERER, format!("{}/", self.endpoints.web));
        if !self.cookies_string.is_empty() {
            request = request.header(COOKIE, &self.cookies_string);
        }
        if let Some(token) = &self.csrf_token {
            request = request.header("X-CSRFToken", token);
        }
        request
    }

    pub async fn get_profile(&self, username: &str) -> Result<Profile, CrawlerError> {
        let url = format!("{}/api/v1/users/web_profile_info/", self.endpoints.api);
        debug!(username, "loading profile");
        let resp = self
            .get(&url)
            .query(&[("username", username)])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(CrawlerError::ProfileNotFound(username.to_string()));
        }
        let body = read_json(resp).await?;
        let user = &body["data"]["user"];
        if user.is_null() {
            return Err(CrawlerError::ProfileNotFound(username.to_string()));
        }
        let profile = Profile::from_user(user)?;
        if profile.is_private && !profile.followed_by_viewer {
            if !self.authenticated {
                return Err(CrawlerError::LoginRequired);
            }
            warn!(username, "profile is private and not followed, posts may be hidden");
        }
        Ok(profile)
    }

    pub async fn get_posts_page(
        &self,
        user_id: &str,
        after: Option<&str>,
    ) -> Result<PostPage, CrawlerError> {
        let url = format!("{}/graphql/query/", self.endpoints.web);
        let variables = json!({ "id": user_id, "first": POSTS_PER_PAGE, "after": after });
        debug!(user_id, cursor = ?after, "fetching post page");
        let resp = self
            .get(&url)
            .query(&[
                ("query_hash", POSTS_QUERY_HASH.to_string()),
                ("variables", variables.to_string()),
            ])
            .send()
            .await?;
        let body = read_json(resp).await?;
        let media = &body["data"]["user"]["edge_owner_to_timeline_media"];
        let (_, page) = PostPage::from_connection(media)?;
        Ok(page)
    }

    /// Lazily iterate the posts of `profile`, newest first.
    pub fn posts<'a>(&'a self, profile: &Profile) -> ProfilePosts<'a> {
        ProfilePosts::new(self, profile)
    }

    /// Like [`InstaCrawler::posts`], taking the page failure limit from `config`.
    pub fn posts_with_config<'a>(
        &'a self,
        profile: &Profile,
        config: &CrawlConfig,
    ) -> ProfilePosts<'a> {
        ProfilePosts::new(self, profile).with_max_page_failures(config.max_page_failures)
    }
}

#[async_trait]
impl Authenticator for InstaCrawler {
    async fn login(&self, username: &str, password: &str) -> Result<Session, CrawlerError> {
        let mut session = Session::new(username);

        let resp = self.get(&format!("{}/", self.endpoints.web)).send().await?;
        collect_cookies(&resp, &mut session);
        let csrf_token = session
            .csrf_token()
            .ok_or_else(|| CrawlerError::LoginFailed("no csrftoken in response".to_string()))?
            .to_string();

        let enc_password = format!(
            "#PWD_INSTAGRAM_BROWSER:0:{}:{}",
            chrono::Utc::now().timestamp(),
            password
        );
        let params = [("username", username), ("enc_password", enc_password.as_str())];
        let resp = self
            .client
            .post(format!("{}/accounts/login/ajax/", self.endpoints.web))
            .header("X-IG-App-ID", APP_ID)
            .header("X-CSRFToken", csrf_token)
            .header(REFERER, format!("{}/", self.endpoints.web))
            .header(COOKIE, session.cookie_header())
            .form(&params)
            .send()
            .await?;
        collect_cookies(&resp, &mut session);

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CrawlerError::RateLimited);
        }
        let url = resp.url().to_string();
        let text = resp.text().await?;
        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(CrawlerError::Http { status, url }),
            Err(e) => return Err(e.into()),
        };

        if body["two_factor_required"].as_bool() == Some(true) {
            return Err(CrawlerError::TwoFactorRequired(username.to_string()));
        }
        if let Some(checkpoint) = body["checkpoint_url"].as_str() {
            return Err(CrawlerError::Checkpoint(checkpoint.to_string()));
        }
        if body["status"].as_str() != Some("ok") {
            let message = body["message"].as_str().unwrap_or("login error");
            return Err(CrawlerError::LoginFailed(message.to_string()));
        }
        if body["user"].as_bool() == Some(false) {
            return Err(CrawlerError::LoginFailed(format!(
                "user {} does not exist",
                username
            )));
        }
        if body["authenticated"].as_bool() != Some(true) {
            return Err(CrawlerError::LoginFailed(format!(
                "wrong password for {}",
                username
            )));
        }
        if !session.is_authenticated() {
            return Err(CrawlerError::LoginFailed(
                "login response carried no session cookie".to_string(),
            ));
        }
        debug!(username, "logged in");
        Ok(session)
    }
}

/// Check the status and body of an API response and return its JSON.
async fn read_json(resp: Response) -> Result<Value, CrawlerError> {
    let status = resp.status();
    let url = resp.url().clone();
    if url.path().starts_with("/accounts/login") {
        return Err(CrawlerError::LoginRequired);
    }
    match status {
        StatusCode::UNAUTHORIZED => return Err(CrawlerError::LoginRequired),
        StatusCode::TOO_MANY_REQUESTS => return Err(CrawlerError::RateLimited),
        s if !s.is_success() => {
            let text = resp.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<Value>(&text) {
                check_failure_body(&body)?;
            }
            return Err(CrawlerError::Http {
                status: s,
                url: url.to_string(),
            });
        }
        _ => {}
    }
    let body: Value = serde_json::from_str(&resp.text().await?)?;
    check_failure_body(&body)?;
    Ok(body)
}

fn check_failure_body(body: &Value) -> Result<(), CrawlerError> {
    if body["require_login"].as_bool() == Some(true) {
        return Err(CrawlerError::LoginRequired);
    }
    if body["status"].as_str() == Some("fail") {
        let message = body["message"].as_str().unwrap_or_default();
        if message.contains("Please wait a few minutes") {
            return Err(CrawlerError::RateLimited);
        }
        return Err(CrawlerError::Parse(format!("request failed: {}", message)));
    }
    Ok(())
}

fn collect_cookies(resp: &Response, session: &mut Session) {
    for value in resp.headers().get_all(SET_COOKIE) {
        let Ok(value) = value.to_str() else { continue };
        let pair = value.split(';').next().unwrap_or_default();
        if let Some((name, value)) = pair.split_once('=') {
            let (name, value) = (name.trim(), value.trim());
            if !name.is_empty() && !value.is_empty() && value != "\"\"" {
                session.cookies.insert(name.to_string(), value.to_string());
            }
        }
    }
}
