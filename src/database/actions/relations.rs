use sqlx::{Pool, Postgres};

use crate::constants::SUBSCRIPTION_COUNT_PER_PAGE;
use crate::database::dto::{SubscriptionRead, TinyRecipe};
use crate::database::error::Error;
use crate::database::pagination::PageContext;
use crate::database::schema::{FollowedAuthorRow, Recipe, User};

// Every add below checks the pair before inserting so a duplicate gets a
// descriptive 400 instead of a raw constraint violation. A concurrent insert
// racing the check still hits the unique constraint and surfaces as a query
// error; that window is accepted.

pub async fn is_favorite(user_id: i32, recipe_id: i32, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT recipe_id FROM favorites WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

pub async fn add_favorite(user_id: i32, recipe_id: i32, pool: &Pool<Postgres>) -> Result<(), Error> {
    if is_favorite(user_id, recipe_id, pool).await? {
        return Err(Error::Duplicate(String::from(
            "recipe is already in favorites",
        )));
    }

    sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn remove_favorite(
    user_id: i32,
    recipe_id: i32,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::MissingEntry(String::from(
            "recipe is not in favorites",
        )));
    }

    Ok(())
}

pub async fn is_in_cart(user_id: i32, recipe_id: i32, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT recipe_id FROM cart_entries WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

pub async fn add_cart_entry(
    user_id: i32,
    recipe_id: i32,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if is_in_cart(user_id, recipe_id, pool).await? {
        return Err(Error::Duplicate(String::from(
            "recipe is already in the shopping cart",
        )));
    }

    sqlx::query("INSERT INTO cart_entries (user_id, recipe_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn remove_cart_entry(
    user_id: i32,
    recipe_id: i32,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM cart_entries WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::MissingEntry(String::from(
            "recipe is not in the shopping cart",
        )));
    }

    Ok(())
}

pub fn validate_follow(user_id: i32, author_id: i32) -> Result<(), Error> {
    if user_id == author_id {
        return Err(Error::validation("author", "cannot subscribe to yourself"));
    }
    Ok(())
}

pub async fn is_following(user_id: i32, author_id: i32, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT author_id FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

pub async fn follow_user(user_id: i32, author_id: i32, pool: &Pool<Postgres>) -> Result<(), Error> {
    validate_follow(user_id, author_id)?;

    if is_following(user_id, author_id, pool).await? {
        return Err(Error::Duplicate(String::from("already subscribed")));
    }

    sqlx::query("INSERT INTO follows (user_id, author_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn unfollow_user(user_id: i32, author_id: i32, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::MissingEntry(String::from("not subscribed")));
    }

    Ok(())
}

/// Recipe preview and total for one followed author; `recipes_limit` caps the
/// preview without affecting the count.
async fn author_recipe_preview(
    author_id: i32,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<(Vec<TinyRecipe>, i64), Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await?;

    let recipes: Vec<Recipe> = match recipes_limit {
        Some(limit) => {
            sqlx::query_as(
                "SELECT * FROM recipes WHERE author_id = $1 ORDER BY name, cooking_time LIMIT $2",
            )
            .bind(author_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM recipes WHERE author_id = $1 ORDER BY name, cooking_time")
                .bind(author_id)
                .fetch_all(pool)
                .await?
        }
    };

    Ok((recipes.into_iter().map(Into::into).collect(), count.0))
}

pub async fn get_subscription(
    author: User,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionRead, Error> {
    let (recipes, recipes_count) = author_recipe_preview(author.id, recipes_limit, pool).await?;

    Ok(SubscriptionRead {
        id: author.id,
        email: author.email,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed: true,
        recipes,
        recipes_count,
    })
}

pub async fn fetch_subscriptions(
    user_id: i32,
    offset: i64,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionRead>, Error> {
    let rows: Vec<FollowedAuthorRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, COUNT(*) OVER () AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(SUBSCRIPTION_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);

    let mut subscriptions = Vec::with_capacity(rows.len());
    for row in rows {
        let (recipes, recipes_count) = author_recipe_preview(row.id, recipes_limit, pool).await?;
        subscriptions.push(SubscriptionRead {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            is_subscribed: true,
            recipes,
            recipes_count,
        });
    }

    Ok(PageContext::from_rows(
        subscriptions,
        total_count,
        SUBSCRIPTION_COUNT_PER_PAGE,
        offset,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn following_yourself_is_rejected() {
        assert!(matches!(
            validate_follow(5, 5),
            Err(Error::Validation { field: "author", .. })
        ));
    }

    #[test]
    fn following_someone_else_passes() {
        assert!(validate_follow(5, 6).is_ok());
    }
}
