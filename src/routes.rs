use warp::{Filter, Rejection, Reply};

use crate::{
    form::{
        LabelPayload, LabelQuery, ProfilePayload, RecipePayload, RecipeQuery, SignupPayload,
        TokenPayload,
    },
    handlers,
    middleware::{with_session, with_state},
    schema::{LabelKind, Uuid},
    state::AppState,
};

/// `true` for PUT, `false` for PATCH.
fn full_update() -> impl Filter<Extract = (bool,), Error = Rejection> + Clone {
    warp::put()
        .map(|| true)
        .or(warp::patch().map(|| false))
        .unify()
}

fn user_routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let create = warp::path!("api" / "user" / "create")
        .and(warp::post())
        .and(warp::body::json::<SignupPayload>())
        .and(with_state(state.clone()))
        .and_then(handlers::create_user);

    let token = warp::path!("api" / "user" / "token")
        .and(warp::post())
        .and(warp::body::json::<TokenPayload>())
        .and(with_state(state.clone()))
        .and_then(handlers::create_token);

    let me = warp::path!("api" / "user" / "me")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_profile);

    let update_me = warp::path!("api" / "user" / "me")
        .and(full_update())
        .and(with_session(state.clone()))
        .and(warp::body::json::<ProfilePayload>())
        .and(with_state(state))
        .and_then(handlers::update_profile);

    create.or(token).or(me).or(update_me)
}

fn recipe_routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("api" / "recipe" / "recipes")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(warp::query::<RecipeQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_recipes);

    let create = warp::path!("api" / "recipe" / "recipes")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(warp::body::json::<RecipePayload>())
        .and(with_state(state.clone()))
        .and_then(handlers::create_recipe);

    let detail = warp::path!("api" / "recipe" / "recipes" / Uuid)
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_recipe);

    let update = warp::path!("api" / "recipe" / "recipes" / Uuid)
        .and(full_update())
        .and(with_session(state.clone()))
        .and(warp::body::json::<RecipePayload>())
        .and(with_state(state.clone()))
        .and_then(handlers::update_recipe);

    let delete = warp::path!("api" / "recipe" / "recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::delete_recipe);

    let upload = warp::path!("api" / "recipe" / "recipes" / Uuid / "upload-image")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(warp::multipart::form().max_length(state.max_upload_bytes))
        .and(with_state(state))
        .and_then(handlers::upload_recipe_image);

    list.or(create).or(detail).or(update).or(delete).or(upload)
}

/// Collection and item routes of tags or ingredients.
fn label_routes(
    kind: LabelKind,
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let base = warp::path("api")
        .and(warp::path("recipe"))
        .and(warp::path(kind.table()))
        .map(move || kind);

    let list = base
        .clone()
        .and(warp::path::end())
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(warp::query::<LabelQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_labels);

    let create = base
        .clone()
        .and(warp::path::end())
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(warp::body::json::<LabelPayload>())
        .and(with_state(state.clone()))
        .and_then(handlers::create_label);

    let detail = base
        .clone()
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_label);

    let update = base
        .clone()
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::put().or(warp::patch()).unify())
        .and(with_session(state.clone()))
        .and(warp::body::json::<LabelPayload>())
        .and(with_state(state.clone()))
        .and_then(handlers::update_label);

    let delete = base
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(handlers::delete_label);

    list.or(create).or(detail).or(update).or(delete)
}

/// The whole API plus the uploaded media, with errors rendered as JSON.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = std::convert::Infallible> + Clone {
    let media = warp::path(state.media.segment())
        .and(warp::get())
        .and(warp::fs::dir(state.media.root().to_path_buf()));

    user_routes(state.clone())
        .or(recipe_routes(state.clone()))
        .or(label_routes(LabelKind::Tag, state.clone()))
        .or(label_routes(LabelKind::Ingredient, state))
        .or(media)
        .recover(handlers::handle_rejection)
}
