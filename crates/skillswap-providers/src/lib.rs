//! Thin clients for the third-party services the marketplace consumes:
//! a generative-language model (content gate, description generation,
//! keyword screening), transactional email, push notifications, geocoding
//! and video search. All of them are consumed, never reimplemented.

pub mod genai;
pub mod geocode;
pub mod mailer;
pub mod push;
pub mod videos;

pub use genai::GenAiClient;
pub use geocode::Geocoder;
pub use mailer::Mailer;
pub use push::PushClient;
pub use videos::VideoSearch;

/// Everything the handlers need, bundled for AppState.
pub struct Providers {
    pub genai: Option<GenAiClient>,
    pub mailer: Mailer,
    pub push: Option<PushClient>,
    pub geocoder: Option<Geocoder>,
    pub videos: Option<VideoSearch>,
}
