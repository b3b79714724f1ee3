use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::fmt::{self, Display};

use crate::error::CrawlerError;

/// One page of a profile's timeline. Nodes stay raw until they are pulled.
#[derive(Debug, Clone, Default)]
pub struct PostPage {
    pub nodes: Vec<Value>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

impl PostPage {
    /// Parse an `edge_owner_to_timeline_media` object.
    pub fn from_connection(media: &Value) -> Result<(u64, PostPage), CrawlerError> {
        let count = media["count"].as_u64().unwrap_or(0);
        let edges = media["edges"]
            .as_array()
            .ok_or_else(|| CrawlerError::Parse("timeline has no edges".to_string()))?;
        let nodes = edges.iter().map(|edge| edge["node"].clone()).collect();
        let page_info = &media["page_info"];
        let page = PostPage {
            nodes,
            end_cursor: page_info["end_cursor"].as_str().map(str::to_string),
            has_next_page: page_info["has_next_page"].as_bool().unwrap_or(false),
        };
        Ok((count, page))
    }
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub followers: u64,
    pub followees: u64,
    pub media_count: u64,
    pub is_private: bool,
    pub followed_by_viewer: bool,
    pub first_page: PostPage,
}

impl Profile {
    /// Parse the `data.user` object of a profile info response.
    pub fn from_user(user: &Value) -> Result<Profile, CrawlerError> {
        let field = |name: &str| {
            user[name]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| CrawlerError::Parse(format!("profile is missing {}", name)))
        };
        let (media_count, first_page) =
            PostPage::from_connection(&user["edge_owner_to_timeline_media"])?;
        Ok(Profile {
            id: field("id")?,
            username: field("username")?,
            full_name: user["full_name"].as_str().unwrap_or_default().to_string(),
            followers: user["edge_followed_by"]["count"].as_u64().unwrap_or(0),
            followees: user["edge_follow"]["count"].as_u64().unwrap_or(0),
            media_count,
            is_private: user["is_private"].as_bool().unwrap_or(false),
            followed_by_viewer: user["followed_by_viewer"].as_bool().unwrap_or(false),
            first_page,
        })
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.full_name)
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub shortcode: String,
    pub url: String,
    pub media_url: String,
    pub taken_at: DateTime<Utc>,
    pub likes: u64,
    pub comments: u64,
    pub caption: Option<String>,
    pub is_video: bool,
}

impl Post {
    /// Parse a timeline media node.
    pub fn from_node(node: &Value) -> Result<Post, CrawlerError> {
        let shortcode = node["shortcode"]
            .as_str()
            .ok_or_else(|| CrawlerError::Parse("post is missing shortcode".to_string()))?;
        let taken_at = node["taken_at_timestamp"]
            .as_i64()
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .ok_or_else(|| {
                CrawlerError::Parse(format!("post {} has no valid timestamp", shortcode))
            })?;
        // liked_by is only present for logged-in viewers
        let likes = node["edge_liked_by"]["count"]
            .as_u64()
            .or_else(|| node["edge_media_preview_like"]["count"].as_u64())
            .unwrap_or(0);
        let caption = node["edge_media_to_caption"]["edges"][0]["node"]["text"]
            .as_str()
            .map(str::to_string);

        Ok(Post {
            shortcode: shortcode.to_string(),
            url: format!("https://www.instagram.com/p/{}/", shortcode),
            media_url: node["display_url"].as_str().unwrap_or_default().to_string(),
            taken_at,
            likes,
            comments: node["edge_media_to_comment"]["count"].as_u64().unwrap_or(0),
            caption,
            is_video: node["is_video"].as_bool().unwrap_or(false),
        })
    }
}

impl Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} taken_at: {} likes: {} comments: {}",
            self.shortcode, self.taken_at, self.likes, self.comments
        )
    }
}
