use axum::{
    extract::{Path, State},
    http::{
        header::{COOKIE, SET_COOKIE, USER_AGENT},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Redirect, Response},
    Json,
};
use tracing::{info, instrument, warn};

use super::{
    bot_detection,
    types::{AccessStatus, RoomAccessResponse},
};
use crate::admission::{AdmissionController, Decision};
use crate::room::RoomRepository;
use crate::shared::{AppError, AppState};

/// Cookie carrying the participant token
pub const AUTH_COOKIE: &str = "x-auth-token";

const ROOM_NOT_FOUND_URL: &str = "/?error=room-not-found";
const ROOM_FULL_URL: &str = "/?error=room-full";

/// HTTP handler guarding entry to a room
///
/// GET /room/:room_id
/// Passes through admitted participants and preview bots, redirects everyone
/// else back to the landing page with an error code.
#[instrument(name = "room_gate", skip(state, headers))]
pub async fn room_gate(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    let is_bot = bot_detection::classify(user_agent, state.environment.is_development());

    if is_bot {
        // Bots see the room without taking a slot, but only if it exists
        let rooms = RoomRepository::new(state.store.clone());
        if rooms.get_room(&room_id).await?.is_none() {
            return Ok(Redirect::temporary(ROOM_NOT_FOUND_URL).into_response());
        }

        info!(room_id = %room_id, "Letting preview bot through without a slot");
        let mut response = access_response(room_id, AccessStatus::Bot);
        response
            .headers_mut()
            .insert("x-is-bot", HeaderValue::from_static("true"));
        return Ok(response);
    }

    let existing_token = auth_token(&headers);
    let controller =
        AdmissionController::new(state.store.clone(), state.admission_config.clone());
    let decision = controller
        .evaluate_admission(&room_id, existing_token.as_deref())
        .await?;

    let response = match decision {
        Decision::NotFound => Redirect::temporary(ROOM_NOT_FOUND_URL).into_response(),
        Decision::RoomFull => Redirect::temporary(ROOM_FULL_URL).into_response(),
        Decision::AlreadyAdmitted => access_response(room_id, AccessStatus::AlreadyAdmitted),
        Decision::Admitted(token) => {
            let mut response = access_response(room_id, AccessStatus::Admitted);
            let cookie = auth_cookie(&token, !state.environment.is_development());
            let value = HeaderValue::from_str(&cookie).map_err(|e| {
                warn!(error = %e, "Minted token is not a valid header value");
                AppError::Internal
            })?;
            response.headers_mut().insert(SET_COOKIE, value);
            response
        }
    };

    Ok(response)
}

/// HTTP handler refreshing the caller's activity record
///
/// POST /room/:room_id/heartbeat
/// Requires the token cookie; answers 204 once the record is refreshed.
#[instrument(name = "heartbeat", skip(state, headers))]
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = auth_token(&headers).ok_or_else(|| {
        warn!("Heartbeat without a token cookie");
        AppError::Unauthorized("Missing token cookie".to_string())
    })?;

    let controller =
        AdmissionController::new(state.store.clone(), state.admission_config.clone());
    controller.record_heartbeat(&room_id, &token).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn access_response(room_id: String, status: AccessStatus) -> Response {
    Json(RoomAccessResponse { room_id, status }).into_response()
}

/// Extracts the token cookie from every `Cookie` header present
fn auth_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn auth_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!("{AUTH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
