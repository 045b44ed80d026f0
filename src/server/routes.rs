use std::convert::Infallible;

use sqlx::{Pool, Postgres};
use warp::{Filter, Rejection, Reply};

use crate::authentication::middleware::{with_possible_session, with_session};

use super::handlers;

fn with_pool(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (Pool<Postgres>,), Error = Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

fn query_pairs() -> impl Filter<Extract = (Vec<(String, String)>,), Error = Rejection> + Copy {
    warp::query::<Vec<(String, String)>>()
}

/// Full route tree. Apply `handlers::handle_rejection` with `.recover` when
/// serving.
pub fn routes(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let recipes_list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(query_pairs())
        .and(with_possible_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::list_recipes);

    let recipes_create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::create_recipe);

    let shopping_cart_download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::download_shopping_cart);

    let recipes_get = warp::path!("api" / "recipes" / i32)
        .and(warp::get())
        .and(with_possible_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::get_recipe);

    let recipes_update = warp::path!("api" / "recipes" / i32)
        .and(warp::patch())
        .and(with_session())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::update_recipe);

    let recipes_delete = warp::path!("api" / "recipes" / i32)
        .and(warp::delete())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::delete_recipe);

    let favorite_add = warp::path!("api" / "recipes" / i32 / "favorite")
        .and(warp::post())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::add_favorite);

    let favorite_remove = warp::path!("api" / "recipes" / i32 / "favorite")
        .and(warp::delete())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::remove_favorite);

    let cart_add = warp::path!("api" / "recipes" / i32 / "shopping_cart")
        .and(warp::post())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::add_to_cart);

    let cart_remove = warp::path!("api" / "recipes" / i32 / "shopping_cart")
        .and(warp::delete())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::remove_from_cart);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(query_pairs())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::list_subscriptions);

    let user_me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::current_user);

    let subscribe = warp::path!("api" / "users" / i32 / "subscribe")
        .and(warp::post())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::subscribe);

    let unsubscribe = warp::path!("api" / "users" / i32 / "subscribe")
        .and(warp::delete())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::unsubscribe);

    let user_get = warp::path!("api" / "users" / i32)
        .and(warp::get())
        .and(with_possible_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::get_user);

    let tags_list = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(handlers::list_tags);

    let tags_get = warp::path!("api" / "tags" / i32)
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(handlers::get_tag);

    let ingredients_list = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(query_pairs())
        .and(with_pool(pool.clone()))
        .and_then(handlers::list_ingredients);

    let ingredients_get = warp::path!("api" / "ingredients" / i32)
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(handlers::get_ingredient);

    let ingredients_import = warp::path!("api" / "ingredients" / "import")
        .and(warp::post())
        .and(with_session())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::import_ingredients);

    let auth_register = warp::path!("api" / "auth" / "register")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::register);

    let auth_login = warp::path!("api" / "auth" / "login")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_pool(pool))
        .and_then(handlers::login);

    recipes_list
        .or(recipes_create)
        .or(shopping_cart_download)
        .or(recipes_get)
        .or(recipes_update)
        .or(recipes_delete)
        .or(favorite_add)
        .or(favorite_remove)
        .or(cart_add)
        .or(cart_remove)
        .or(subscriptions)
        .or(user_me)
        .or(subscribe)
        .or(unsubscribe)
        .or(user_get)
        .or(tags_list)
        .or(tags_get)
        .or(ingredients_list)
        .or(ingredients_import)
        .or(ingredients_get)
        .or(auth_register)
        .or(auth_login)
}
