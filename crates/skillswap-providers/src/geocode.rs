use anyhow::Result;
use serde::Deserialize;

/// Forward geocoding against a Nominatim-compatible endpoint. Best-effort:
/// a miss or provider failure just leaves the skill without coordinates.
pub struct Geocoder {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
}

impl Geocoder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn lookup(&self, place: &str) -> Result<Option<(f64, f64)>> {
        let resp = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .header("User-Agent", "skillswap")
            .send()
            .await?
            .error_for_status()?;

        let hits: Vec<GeocodeHit> = resp.json().await?;
        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        match (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Ok(Some((lat, lon))),
            _ => Ok(None),
        }
    }
}
