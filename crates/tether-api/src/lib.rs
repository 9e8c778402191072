pub mod admin;
pub mod auth;
pub mod error;
pub mod friends;
pub mod middleware;
pub mod posts;
pub mod refresh;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// Build the /v1 API router over shared state.
///
/// The refresh-token routes sit outside the JWT middleware: their bearer
/// token is the opaque refresh token, validated against the store instead
/// of the signing key.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/login", post(auth::login))
        .route("/users", post(users::create_user))
        .route(
            "/refresh-token",
            post(refresh::refresh_access_token).delete(refresh::revoke_refresh_token),
        )
        .route("/reset", post(admin::reset));

    let protected = Router::new()
        .route("/users/avatar", put(users::update_avatar))
        .route("/users/{username}", get(users::get_user))
        .route(
            "/users/{username}/friends/{friend_username}",
            post(friends::add_friend),
        )
        .route("/users/{username}/friends", get(friends::get_non_friends))
        .route("/users/{username}/friendslist", get(friends::get_friends_list))
        .route("/posts", get(posts::get_all_posts).post(posts::create_post))
        .route("/posts/{username}", get(posts::get_user_posts))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/v1", Router::new().merge(public).merge(protected))
        .with_state(state)
}
