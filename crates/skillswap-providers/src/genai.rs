use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Client for the generative-language provider. Holds an ordered list of
/// API keys; every call walks the list, moving to the next key on error,
/// and surfaces a single failure only after all keys are exhausted.
pub struct GenAiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_keys: Vec<String>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenAiClient {
    pub fn new(api_keys: Vec<String>) -> Result<Self> {
        if api_keys.is_empty() {
            bail!("GenAiClient needs at least one API key");
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_keys,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Run one prompt through the model, falling back through the key list.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let mut last_err = anyhow!("no API keys configured");

        for (i, key) in self.api_keys.iter().enumerate() {
            match self.generate_with_key(key, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("generative model call failed on key {}: {}", i + 1, e);
                    last_err = e;
                }
            }
        }

        Err(last_err.context("all generative model API keys exhausted"))
    }

    async fn generate_with_key(&self, key: &str, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, key
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            bail!("generative model returned {}", status);
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| anyhow!("generative model returned no candidates"))?;

        Ok(text)
    }

    /// Yes/no legitimacy gate for a skill posting.
    pub async fn screen_skill(&self, title: &str, description: &str) -> Result<bool> {
        let prompt = format!(
            "You are a content-safety reviewer for a skill-swap marketplace. \
             Is the following a legitimate, teachable skill posting (not spam, \
             not harmful, not adult content)? Answer with a single word, yes or no.\n\n\
             Title: {title}\nDescription: {description}"
        );
        let answer = self.generate(&prompt).await?;
        Ok(parse_yes_no(&answer))
    }

    /// Yes/no gate for a search keyword.
    pub async fn screen_keyword(&self, keyword: &str) -> Result<bool> {
        let prompt = format!(
            "Is the following search term appropriate for a family-friendly \
             skill-swap marketplace? Answer with a single word, yes or no.\n\n\
             Term: {keyword}"
        );
        let answer = self.generate(&prompt).await?;
        Ok(parse_yes_no(&answer))
    }

    /// AI-assisted description for a skill posting.
    pub async fn suggest_description(&self, title: &str, category: &str) -> Result<String> {
        let prompt = format!(
            "Write a friendly two-sentence description for a skill-swap \
             marketplace posting. The skill is \"{title}\" in the \
             \"{category}\" category. Respond with the description only."
        );
        let text = self.generate(&prompt).await?;
        Ok(text.trim().to_string())
    }
}

/// Loose parse of the model's verdict: a leading "yes" means yes, anything
/// else (including garbage) means no.
fn parse_yes_no(answer: &str) -> bool {
    answer.trim().to_ascii_lowercase().starts_with("yes")
}

#[cfg(test)]
mod tests {
    use super::parse_yes_no;

    #[test]
    fn verdict_parsing_is_loose() {
        assert!(parse_yes_no("yes"));
        assert!(parse_yes_no("Yes."));
        assert!(parse_yes_no("  YES, this is fine"));
        assert!(!parse_yes_no("no"));
        assert!(!parse_yes_no("No, this is spam"));
        assert!(!parse_yes_no("maybe"));
        assert!(!parse_yes_no(""));
    }
}
