use std::convert::Infallible;

use futures::TryStreamExt;
use serde::Serialize;
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    multipart::FormData,
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, MissingHeader,
        PayloadTooLarge, UnsupportedMediaType,
    },
    reply::{json, with_status},
    Buf, Rejection, Reply,
};

use crate::{
    actions::{labels, recipes, users},
    constants::RECIPE_IMAGE_FIELD,
    error::{ApiError, ErrorBody},
    form::{
        LabelPayload, LabelQuery, ProfilePayload, RecipePayload, RecipeQuery, SignupPayload,
        TokenPayload,
    },
    jwt::SessionData,
    schema::{LabelKind, Uuid},
    state::AppState,
};

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

pub async fn create_user(payload: SignupPayload, state: AppState) -> Result<impl Reply, Rejection> {
    let profile = users::create_user(payload, state.store.as_ref()).await?;

    Ok(with_status(json(&profile), StatusCode::CREATED))
}

pub async fn create_token(payload: TokenPayload, state: AppState) -> Result<impl Reply, Rejection> {
    let token = users::login_user(payload, state.store.as_ref(), &state.tokens).await?;

    Ok(json(&TokenResponse { token }))
}

pub async fn get_profile(session: SessionData, state: AppState) -> Result<impl Reply, Rejection> {
    let profile = users::get_profile(&session, state.store.as_ref()).await?;

    Ok(json(&profile))
}

pub async fn update_profile(
    full: bool,
    session: SessionData,
    payload: ProfilePayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let profile = users::update_profile(&session, payload, full, state.store.as_ref()).await?;

    Ok(json(&profile))
}

pub async fn list_recipes(
    session: SessionData,
    query: RecipeQuery,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let filter = query.to_filter()?;
    let rows = recipes::list_recipes(&session.owner(), &filter, state.store.as_ref()).await?;

    Ok(json(&rows))
}

pub async fn create_recipe(
    session: SessionData,
    payload: RecipePayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let detail =
        recipes::create_recipe(&session.owner(), payload, state.store.as_ref(), &state.media)
            .await?;

    Ok(with_status(json(&detail), StatusCode::CREATED))
}

pub async fn get_recipe(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let detail =
        recipes::get_recipe(&session.owner(), id, state.store.as_ref(), &state.media).await?;

    Ok(json(&detail))
}

pub async fn update_recipe(
    id: Uuid,
    full: bool,
    session: SessionData,
    payload: RecipePayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let detail = recipes::update_recipe(
        &session.owner(),
        id,
        payload,
        full,
        state.store.as_ref(),
        &state.media,
    )
    .await?;

    Ok(json(&detail))
}

pub async fn delete_recipe(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    recipes::delete_recipe(&session.owner(), id, state.store.as_ref(), &state.media).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Reads the contents of the image part, skipping any other parts.
async fn read_image(form: FormData) -> Result<Option<Vec<u8>>, ApiError> {
    let malformed = |e: warp::Error| ApiError::invalid(RECIPE_IMAGE_FIELD, format!("{e}"));
    let mut form = std::pin::pin!(form);

    while let Some(part) = form.try_next().await.map_err(malformed)? {
        if part.name() != RECIPE_IMAGE_FIELD {
            continue;
        }

        let bytes = part
            .stream()
            .try_fold(Vec::new(), |mut bytes, chunk| async move {
                bytes.extend_from_slice(chunk.chunk());
                Ok(bytes)
            })
            .await
            .map_err(malformed)?;

        return Ok(Some(bytes));
    }

    Ok(None)
}

pub async fn upload_recipe_image(
    id: Uuid,
    session: SessionData,
    form: FormData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let bytes = read_image(form)
        .await?
        .ok_or_else(|| ApiError::invalid(RECIPE_IMAGE_FIELD, "No file was submitted."))?;

    let image = recipes::upload_recipe_image(
        &session.owner(),
        id,
        &bytes,
        state.store.as_ref(),
        &state.media,
    )
    .await?;

    Ok(json(&image))
}

pub async fn list_labels(
    kind: LabelKind,
    session: SessionData,
    query: LabelQuery,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let rows = labels::list_labels(
        kind,
        &session.owner(),
        query.assigned_only(),
        state.store.as_ref(),
    )
    .await?;

    Ok(json(&rows))
}

pub async fn create_label(
    kind: LabelKind,
    session: SessionData,
    payload: LabelPayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let label = labels::create_label(kind, &session.owner(), payload, state.store.as_ref()).await?;

    Ok(with_status(json(&label), StatusCode::CREATED))
}

pub async fn get_label(
    kind: LabelKind,
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let label = labels::get_label(kind, &session.owner(), id, state.store.as_ref()).await?;

    Ok(json(&label))
}

pub async fn update_label(
    kind: LabelKind,
    id: Uuid,
    session: SessionData,
    payload: LabelPayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let label =
        labels::update_label(kind, &session.owner(), id, payload, state.store.as_ref()).await?;

    Ok(json(&label))
}

pub async fn delete_label(
    kind: LabelKind,
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    labels::delete_label(kind, &session.owner(), id, state.store.as_ref()).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Turns every rejection into a JSON error body.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(e) = err.find::<ApiError>() {
        if e.status() == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("{e}");
        }
        (e.status(), e.body())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, ErrorBody::new(&e.to_string()))
    } else if let Some(e) = err.find::<InvalidQuery>() {
        (StatusCode::BAD_REQUEST, ErrorBody::new(&e.to_string()))
    } else if let Some(e) = err.find::<MissingHeader>() {
        (StatusCode::BAD_REQUEST, ErrorBody::new(&e.to_string()))
    } else if let Some(e) = err.find::<InvalidHeader>() {
        (StatusCode::BAD_REQUEST, ErrorBody::new(&e.to_string()))
    } else if let Some(e) = err.find::<PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, ErrorBody::new(&e.to_string()))
    } else if let Some(e) = err.find::<UnsupportedMediaType>() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, ErrorBody::new(&e.to_string()))
    } else if let Some(e) = err.find::<LengthRequired>() {
        (StatusCode::LENGTH_REQUIRED, ErrorBody::new(&e.to_string()))
    } else if err.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorBody::new("Method not allowed."),
        )
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, ErrorBody::new("Not found."))
    } else {
        log::warn!("Unhandled rejection: {err:?}");
        (StatusCode::BAD_REQUEST, ErrorBody::new("Bad request."))
    };

    Ok(with_status(json(&body), status))
}
