use anyhow::Result;
use serde::Deserialize;

use skillswap_types::api::TutorialVideo;

/// Video-search provider used for the "learn this skill" tutorial lookup.
pub struct VideoSearch {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: VideoId,
    snippet: Snippet,
}

#[derive(Deserialize)]
struct VideoId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct Snippet {
    title: String,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
}

impl VideoSearch {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn search(&self, query: &str, limit: u8) -> Result<Vec<TutorialVideo>> {
        let max_results = limit.to_string();
        let resp = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("q", query),
                ("maxResults", max_results.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let parsed: SearchResponse = resp.json().await?;
        let videos = parsed
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                Some(TutorialVideo {
                    title: item.snippet.title,
                    url: format!("https://www.youtube.com/watch?v={id}"),
                    channel: item.snippet.channel_title,
                })
            })
            .collect();

        Ok(videos)
    }
}
