use axum::{Extension, Json, extract::State, response::IntoResponse};

use skillswap_types::api::{Claims, CreditsResponse};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::view;

const LEDGER_PAGE: u32 = 50;

pub async fn credits(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub.to_string();
    let balance = state.db.get_credits(&user_id)?;
    let ledger = state
        .db
        .credit_ledger(&user_id, LEDGER_PAGE)?
        .into_iter()
        .map(view::credit_entry)
        .collect();

    Ok(Json(CreditsResponse { balance, ledger }))
}
