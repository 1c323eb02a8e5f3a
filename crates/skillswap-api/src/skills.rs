use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use skillswap_db::queries::skills::SkillQuery;
use skillswap_types::api::{
    Claims, CreateSkillRequest, MatchedSkill, SkillFilter, SuggestDescriptionRequest,
    SuggestDescriptionResponse, UpdateSkillRequest,
};
use skillswap_types::models::{Skill, SkillKind};

use crate::error::{ApiError, ApiResult};
use crate::geo;
use crate::profanity;
use crate::state::AppState;
use crate::tags;
use crate::view;

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 200;
const MATCH_LIMIT: usize = 5;
const CATEGORY_SCORE: i64 = 10;
const SHARED_TAG_SCORE: i64 = 5;

pub async fn create_skill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSkillRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_fields(&req.title, &req.description, &req.category)?;
    screen_with_gate(&state, &req.title, &req.description).await?;

    let tag_list = tags::extract_tags(&req.title, &req.description);
    let tags_json = serde_json::to_string(&tag_list)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("tag serialization failed: {e}")))?;

    let coords = geocode_best_effort(&state, req.location.as_deref()).await;

    let skill_id = Uuid::new_v4();
    state.db.insert_skill(
        &skill_id.to_string(),
        &claims.sub.to_string(),
        req.title.trim(),
        req.description.trim(),
        &req.category,
        req.kind.as_str(),
        &tags_json,
        req.location.as_deref(),
        coords.map(|c| c.0),
        coords.map(|c| c.1),
    )?;

    let row = state
        .db
        .get_skill(&skill_id.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("skill vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(view::skill(row))))
}

pub async fn update_skill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(skill_id): Path<Uuid>,
    Json(req): Json<UpdateSkillRequest>,
) -> ApiResult<impl IntoResponse> {
    let existing = state
        .db
        .get_skill(&skill_id.to_string())?
        .ok_or(ApiError::NotFound)?;
    if existing.owner_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("not your skill".into()));
    }

    let title = req.title.unwrap_or(existing.title);
    let description = req.description.unwrap_or(existing.description);
    let category = req.category.unwrap_or(existing.category);
    let location = req.location.or(existing.location);

    validate_fields(&title, &description, &category)?;
    screen_with_gate(&state, &title, &description).await?;

    // Tags are re-derived on every update, never patched in place.
    let tag_list = tags::extract_tags(&title, &description);
    let tags_json = serde_json::to_string(&tag_list)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("tag serialization failed: {e}")))?;

    let coords = match geocode_best_effort(&state, location.as_deref()).await {
        Some(c) => Some(c),
        None => existing.lat.zip(existing.lon),
    };

    state.db.update_skill(
        &skill_id.to_string(),
        title.trim(),
        description.trim(),
        &category,
        &tags_json,
        location.as_deref(),
        coords.map(|c| c.0),
        coords.map(|c| c.1),
    )?;

    let row = state
        .db
        .get_skill(&skill_id.to_string())?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(view::skill(row)))
}

pub async fn delete_skill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(skill_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let existing = state
        .db
        .get_skill(&skill_id.to_string())?
        .ok_or(ApiError::NotFound)?;
    if existing.owner_id != claims.sub.to_string() && claims.role != "admin" {
        return Err(ApiError::Forbidden("not your skill".into()));
    }

    state.db.delete_skill(&skill_id.to_string())?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_skill(
    State(state): State<AppState>,
    Path(skill_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_skill(&skill_id.to_string())?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(view::skill(row)))
}

pub async fn list_skills(
    State(state): State<AppState>,
    Query(filter): Query<SkillFilter>,
) -> ApiResult<impl IntoResponse> {
    // Search keywords pass through the moderation gate like skill content.
    if let (Some(keyword), Some(genai)) = (&filter.keyword, &state.providers.genai) {
        match genai.screen_keyword(keyword).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(ApiError::Rejected("search term rejected".into()));
            }
            // Gate outage degrades to unscreened search.
            Err(e) => warn!("keyword screening unavailable: {}", e),
        }
    }

    let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    let geo_filter = match (filter.lat, filter.lon, filter.radius_km) {
        (Some(lat), Some(lon), Some(radius)) => Some((lat, lon, radius)),
        _ => None,
    };

    let owner = filter.owner.map(|o| o.to_string());
    let query = SkillQuery {
        keyword: filter.keyword.as_deref(),
        category: filter.category.as_deref(),
        kind: filter.kind.map(|k| k.as_str()),
        owner_id: owner.as_deref(),
        // Over-fetch when a radius filter trims the result set afterwards.
        limit: if geo_filter.is_some() { MAX_LIST_LIMIT } else { limit },
    };

    let rows = state.db.list_skills(&query)?;
    let mut skills: Vec<Skill> = rows.into_iter().map(view::skill).collect();

    if let Some((lat, lon, radius)) = geo_filter {
        skills.retain(|s| match (s.lat, s.lon) {
            (Some(slat), Some(slon)) => geo::haversine_km(lat, lon, slat, slon) <= radius,
            _ => false,
        });
        skills.truncate(limit as usize);
    }

    Ok(Json(skills))
}

/// Match one of the caller's request skills against everyone else's
/// offers: +10 for the same category, +5 per shared tag, top 5 by
/// descending score, ties resolved by the candidates' insertion order.
pub async fn matching_skills(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(skill_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_skill(&skill_id.to_string())?
        .ok_or(ApiError::NotFound)?;
    if row.owner_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("not your skill".into()));
    }

    let request = view::skill(row);
    if request.kind != SkillKind::Request {
        return Err(ApiError::BadRequest(
            "matching runs against a request skill".into(),
        ));
    }

    let candidates: Vec<Skill> = state
        .db
        .match_candidates(&claims.sub.to_string())?
        .into_iter()
        .map(view::skill)
        .collect();

    let matches = rank_matches(&request.category, &request.tags, candidates);
    Ok(Json(matches))
}

pub async fn suggest_description(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<SuggestDescriptionRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }

    let Some(genai) = &state.providers.genai else {
        return Err(ApiError::BadRequest(
            "description assistant is not configured".into(),
        ));
    };

    let description = genai
        .suggest_description(req.title.trim(), req.category.trim())
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(SuggestDescriptionResponse { description }))
}

/// Tutorial lookup through the video-search provider. Best-effort: a
/// provider failure yields an empty list, not an error.
pub async fn skill_tutorials(
    State(state): State<AppState>,
    Path(skill_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_skill(&skill_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    let Some(videos) = &state.providers.videos else {
        return Ok(Json(Vec::new()));
    };

    let query = format!("{} tutorial", row.title);
    match videos.search(&query, 5).await {
        Ok(results) => Ok(Json(results)),
        Err(e) => {
            warn!("video search for '{}' failed: {}", row.title, e);
            Ok(Json(Vec::new()))
        }
    }
}

pub fn score_match(category: &str, tags: &[String], candidate: &Skill) -> i64 {
    let mut score = 0;
    if candidate.category == category {
        score += CATEGORY_SCORE;
    }
    score += SHARED_TAG_SCORE
        * candidate.tags.iter().filter(|t| tags.contains(t)).count() as i64;
    score
}

pub fn rank_matches(category: &str, tags: &[String], candidates: Vec<Skill>) -> Vec<MatchedSkill> {
    let mut scored: Vec<MatchedSkill> = candidates
        .into_iter()
        .map(|skill| MatchedSkill {
            score: score_match(category, tags, &skill),
            skill,
        })
        .collect();

    // Stable sort: equal scores keep the underlying query order.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(MATCH_LIMIT);
    scored
}

fn validate_fields(title: &str, description: &str, category: &str) -> ApiResult<()> {
    if title.trim().is_empty() || title.len() > 120 {
        return Err(ApiError::BadRequest("title must be 1-120 characters".into()));
    }
    if description.trim().is_empty() || description.len() > 4000 {
        return Err(ApiError::BadRequest(
            "description must be 1-4000 characters".into(),
        ));
    }
    if category.trim().is_empty() {
        return Err(ApiError::BadRequest("category is required".into()));
    }
    if profanity::contains_profanity(title) || profanity::contains_profanity(description) {
        return Err(ApiError::BadRequest("content contains blocked language".into()));
    }
    Ok(())
}

/// The generative-model legitimacy gate. An outage fails open (warning
/// logged); an explicit "no" verdict rejects the posting.
async fn screen_with_gate(state: &AppState, title: &str, description: &str) -> ApiResult<()> {
    let Some(genai) = &state.providers.genai else {
        return Ok(());
    };

    match genai.screen_skill(title, description).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ApiError::Rejected(
            "this doesn't look like a legitimate skill posting".into(),
        )),
        Err(e) => {
            warn!("moderation gate unavailable, allowing: {}", e);
            Ok(())
        }
    }
}

async fn geocode_best_effort(state: &AppState, location: Option<&str>) -> Option<(f64, f64)> {
    let location = location?;
    let geocoder = state.providers.geocoder.as_ref()?;
    match geocoder.lookup(location).await {
        Ok(hit) => hit,
        Err(e) => {
            warn!("geocoding '{}' failed: {}", location, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn skill(id_byte: u8, owner_byte: u8, category: &str, tags: &[&str]) -> Skill {
        Skill {
            id: Uuid::from_bytes([id_byte; 16]),
            owner_id: Uuid::from_bytes([owner_byte; 16]),
            owner_username: format!("user{owner_byte}"),
            title: "t".into(),
            description: "d".into(),
            category: category.into(),
            kind: SkillKind::Offer,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            location: None,
            lat: None,
            lon: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn category_and_tags_add_up() {
        let candidate = skill(1, 2, "music", &["guitar", "chords", "rhythm"]);
        let tags = vec!["guitar".to_string(), "rhythm".to_string()];
        assert_eq!(score_match("music", &tags, &candidate), 10 + 5 + 5);
        assert_eq!(score_match("cooking", &tags, &candidate), 5 + 5);
        assert_eq!(score_match("cooking", &[], &candidate), 0);
    }

    #[test]
    fn top_five_descending() {
        let tags: Vec<String> = vec!["a".into(), "b".into()];
        let candidates = vec![
            skill(1, 9, "other", &[]),          // 0
            skill(2, 9, "music", &["a", "b"]),  // 20
            skill(3, 9, "music", &[]),          // 10
            skill(4, 9, "other", &["a"]),       // 5
            skill(5, 9, "music", &["a"]),       // 15
            skill(6, 9, "other", &["b"]),       // 5
            skill(7, 9, "music", &["b"]),       // 15
        ];

        let ranked = rank_matches("music", &tags, candidates);
        assert_eq!(ranked.len(), 5);
        let scores: Vec<i64> = ranked.iter().map(|m| m.score).collect();
        assert_eq!(scores, vec![20, 15, 15, 10, 5]);
        // Equal scores keep insertion order: skill 5 before skill 7,
        // skill 4 before skill 6.
        assert_eq!(ranked[1].skill.id, Uuid::from_bytes([5; 16]));
        assert_eq!(ranked[2].skill.id, Uuid::from_bytes([7; 16]));
        assert_eq!(ranked[4].skill.id, Uuid::from_bytes([4; 16]));
    }

    #[test]
    fn fewer_candidates_than_limit() {
        let ranked = rank_matches("music", &[], vec![skill(1, 9, "music", &[])]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].score, 10);
    }
}
