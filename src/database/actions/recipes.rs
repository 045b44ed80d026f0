use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::authentication::jwt::SessionData;
use crate::authentication::permissions::authorize_recipe_mutation;
use crate::constants::{
    MAX_COOKING_TIME, MAX_INGREDIENT_AMOUNT, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT,
    RECIPE_COUNT_PER_PAGE,
};
use crate::database::dto::{NewRecipe, RecipeRead};
use crate::database::error::Error;
use crate::database::pagination::PageContext;
use crate::database::schema::{Amount, Recipe, RecipeRow};

use super::relations::{is_favorite, is_in_cart};
use super::tags::list_recipe_tags;
use super::users::{get_user_by_id, get_user_read};

/// Listing filters; the viewer-bound ones are only set for a live session.
#[derive(Debug, Default, Clone)]
pub struct RecipeFilters {
    pub author: Option<i32>,
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<i32>,
    pub in_cart_of: Option<i32>,
}

pub async fn fetch_recipes(
    filters: &RecipeFilters,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER () AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filters.author {
        query.push(" AND r.author_id = ");
        query.push_bind(author);
    }
    if !filters.tag_slugs.is_empty() {
        query.push(
            " AND r.id IN (
                SELECT rt.recipe_id FROM recipe_tags rt
                INNER JOIN tags t ON t.id = rt.tag_id
                WHERE t.slug = ANY(",
        );
        query.push_bind(filters.tag_slugs.clone());
        query.push("))");
    }
    if let Some(user_id) = filters.favorited_by {
        query.push(" AND r.id IN (SELECT recipe_id FROM favorites WHERE user_id = ");
        query.push_bind(user_id);
        query.push(")");
    }
    if let Some(user_id) = filters.in_cart_of {
        query.push(" AND r.id IN (SELECT recipe_id FROM cart_entries WHERE user_id = ");
        query.push_bind(user_id);
        query.push(")");
    }

    query.push(" ORDER BY r.name, r.cooking_time LIMIT ");
    query.push_bind(RECIPE_COUNT_PER_PAGE);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let rows: Vec<RecipeRow> = query.build_query_as().fetch_all(pool).await?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset);
    Ok(page)
}

pub async fn get_recipe(id: i32, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetches a recipe for mutation; the caller must be its author.
pub async fn get_recipe_mut(
    id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no recipe with id {id}")))?;

    authorize_recipe_mutation(session, &recipe)?;
    Ok(recipe)
}

pub async fn list_recipe_amounts(recipe_id: i32, pool: &Pool<Postgres>) -> Result<Vec<Amount>, Error> {
    let rows: Vec<Amount> = sqlx::query_as(
        "
        SELECT a.recipe_id, a.ingredient_id, i.name, i.measurement_unit, a.amount
        FROM amounts a
        INNER JOIN ingredients i ON i.id = a.ingredient_id
        WHERE a.recipe_id = $1
        ORDER BY a.ingredient_id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Field-level validation of a write shape. Runs before any statement is
/// issued so a failing input never opens a transaction.
pub fn validate_recipe_input(input: &NewRecipe) -> Result<(), Error> {
    if input.ingredients.is_empty() {
        return Err(Error::validation(
            "ingredients",
            "at least one ingredient is required",
        ));
    }

    let mut seen = HashSet::new();
    for part in &input.ingredients {
        if !seen.insert(part.id) {
            return Err(Error::validation(
                "ingredients",
                "ingredients must be unique within a recipe",
            ));
        }
        if part.amount < MIN_INGREDIENT_AMOUNT || part.amount > MAX_INGREDIENT_AMOUNT {
            return Err(Error::validation(
                "amount",
                format!(
                    "amount must be between {MIN_INGREDIENT_AMOUNT} and {MAX_INGREDIENT_AMOUNT}"
                ),
            ));
        }
    }

    if input.tags.is_empty() {
        return Err(Error::validation("tags", "at least one tag is required"));
    }
    let unique_tags: HashSet<_> = input.tags.iter().collect();
    if unique_tags.len() != input.tags.len() {
        return Err(Error::validation("tags", "tags must be unique"));
    }

    if input.cooking_time < MIN_COOKING_TIME || input.cooking_time > MAX_COOKING_TIME {
        return Err(Error::validation(
            "cooking_time",
            format!("cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME} minutes"),
        ));
    }

    Ok(())
}

/// Referenced ids must exist before the write begins; a missing reference in
/// the body is a validation failure, not a 404.
async fn check_references(input: &NewRecipe, pool: &Pool<Postgres>) -> Result<(), Error> {
    let ingredient_ids: Vec<i32> = input.ingredients.iter().map(|part| part.id).collect();
    let found: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
        .bind(ingredient_ids.clone())
        .fetch_one(pool)
        .await?;
    if found.0 != ingredient_ids.len() as i64 {
        return Err(Error::validation("ingredients", "unknown ingredient id"));
    }

    let found: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
        .bind(input.tags.clone())
        .fetch_one(pool)
        .await?;
    if found.0 != input.tags.len() as i64 {
        return Err(Error::validation("tags", "unknown tag id"));
    }

    Ok(())
}

pub async fn create_recipe(
    author_id: i32,
    input: &NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    validate_recipe_input(input)?;
    check_references(input, pool).await?;

    let mut tr = pool.begin().await?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(author_id)
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .fetch_one(&mut *tr)
    .await?;

    insert_tags(recipe.id, &input.tags, &mut tr).await?;
    insert_amounts(recipe.id, input, &mut tr).await?;

    tr.commit().await?;
    Ok(recipe)
}

/// Full replacement: the tag set and the amount set are rewritten wholesale,
/// never diffed, inside one transaction.
pub async fn update_recipe(
    recipe: &Recipe,
    input: &NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    validate_recipe_input(input)?;
    check_references(input, pool).await?;

    let mut tr = pool.begin().await?;

    let updated: Recipe = sqlx::query_as(
        "
        UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4
        WHERE id = $5
        RETURNING *
    ",
    )
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .bind(recipe.id)
    .fetch_one(&mut *tr)
    .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await?;
    insert_tags(recipe.id, &input.tags, &mut tr).await?;

    sqlx::query("DELETE FROM amounts WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await?;
    insert_amounts(recipe.id, input, &mut tr).await?;

    tr.commit().await?;
    Ok(updated)
}

pub async fn delete_recipe(id: i32, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool.begin().await?;

    sqlx::query("DELETE FROM favorites WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM cart_entries WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM amounts WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    tr.commit().await?;
    Ok(())
}

async fn insert_tags(
    recipe_id: i32,
    tag_ids: &[i32],
    tr: &mut sqlx::Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(tag_ids, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    query.build().execute(&mut **tr).await?;
    Ok(())
}

async fn insert_amounts(
    recipe_id: i32,
    input: &NewRecipe,
    tr: &mut sqlx::Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO amounts (recipe_id, ingredient_id, amount) ");
    query.push_values(&input.ingredients, |mut row, part| {
        row.push_bind(recipe_id)
            .push_bind(part.id)
            .push_bind(part.amount);
    });
    query.build().execute(&mut **tr).await?;
    Ok(())
}

/// Assembles the full read shape: author profile, tag objects, resolved
/// ingredient amounts, and the viewer-dependent boolean flags.
pub async fn get_recipe_read(
    recipe: Recipe,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<RecipeRead, Error> {
    let author = get_user_by_id(pool, recipe.author_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no user with id {}", recipe.author_id)))?;
    let author = get_user_read(author, viewer, pool).await?;

    let tags = list_recipe_tags(recipe.id, pool).await?;
    let ingredients = list_recipe_amounts(recipe.id, pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            is_favorite(viewer, recipe.id, pool).await?,
            is_in_cart(viewer, recipe.id, pool).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeRead {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::dto::IngredientAmount;

    fn input() -> NewRecipe {
        NewRecipe {
            name: String::from("Pancakes"),
            image: String::from("data:image/png;base64,xyz"),
            text: String::from("Mix and fry."),
            cooking_time: 20,
            ingredients: vec![
                IngredientAmount { id: 1, amount: 200 },
                IngredientAmount { id: 2, amount: 2 },
            ],
            tags: vec![1, 2],
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(validate_recipe_input(&input()).is_ok());
    }

    #[test]
    fn cooking_time_bounds_are_inclusive() {
        for minutes in [1, 240] {
            let mut recipe = input();
            recipe.cooking_time = minutes;
            assert!(validate_recipe_input(&recipe).is_ok());
        }
        for minutes in [0, 241] {
            let mut recipe = input();
            recipe.cooking_time = minutes;
            assert!(matches!(
                validate_recipe_input(&recipe),
                Err(Error::Validation {
                    field: "cooking_time",
                    ..
                })
            ));
        }
    }

    #[test]
    fn amount_bounds_are_inclusive() {
        for amount in [1, 240] {
            let mut recipe = input();
            recipe.ingredients[0].amount = amount;
            assert!(validate_recipe_input(&recipe).is_ok());
        }
        for amount in [0, 241] {
            let mut recipe = input();
            recipe.ingredients[0].amount = amount;
            assert!(matches!(
                validate_recipe_input(&recipe),
                Err(Error::Validation { field: "amount", .. })
            ));
        }
    }

    #[test]
    fn empty_ingredients_rejected() {
        let mut recipe = input();
        recipe.ingredients.clear();
        assert!(matches!(
            validate_recipe_input(&recipe),
            Err(Error::Validation {
                field: "ingredients",
                ..
            })
        ));
    }

    #[test]
    fn duplicate_ingredient_ids_rejected() {
        let mut recipe = input();
        recipe.ingredients = vec![
            IngredientAmount { id: 1, amount: 100 },
            IngredientAmount { id: 1, amount: 50 },
        ];
        assert!(matches!(
            validate_recipe_input(&recipe),
            Err(Error::Validation {
                field: "ingredients",
                ..
            })
        ));
    }

    #[test]
    fn empty_and_duplicate_tags_rejected() {
        let mut recipe = input();
        recipe.tags.clear();
        assert!(matches!(
            validate_recipe_input(&recipe),
            Err(Error::Validation { field: "tags", .. })
        ));

        let mut recipe = input();
        recipe.tags = vec![3, 3];
        assert!(matches!(
            validate_recipe_input(&recipe),
            Err(Error::Validation { field: "tags", .. })
        ));
    }
}
