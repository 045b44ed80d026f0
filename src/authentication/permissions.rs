use crate::database::error::Error;
use crate::database::schema::Recipe;

use super::jwt::SessionData;

/// Owner-or-read-only: anyone may read, only the author may mutate.
pub fn can_modify_recipe(session: &SessionData, recipe: &Recipe) -> bool {
    recipe.author_id == session.user_id
}

pub fn authorize_recipe_mutation(session: &SessionData, recipe: &Recipe) -> Result<(), Error> {
    if !can_modify_recipe(session, recipe) {
        return Err(Error::Unauthorized(String::from(
            "only the author may modify this recipe",
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::User;
    use crate::jwt::generate_session;
    use crate::jwt::verify_session;

    fn session_for(id: i32) -> SessionData {
        let user = User {
            id,
            email: format!("user{id}@example.com"),
            username: format!("user{id}"),
            first_name: String::new(),
            last_name: String::new(),
            password: String::new(),
        };
        verify_session(&generate_session(&user)).unwrap()
    }

    fn recipe_by(author_id: i32) -> Recipe {
        Recipe {
            id: 1,
            author_id,
            name: String::from("Soup"),
            image: String::new(),
            text: String::new(),
            cooking_time: 30,
        }
    }

    #[test]
    fn author_may_modify() {
        assert!(can_modify_recipe(&session_for(3), &recipe_by(3)));
        assert!(authorize_recipe_mutation(&session_for(3), &recipe_by(3)).is_ok());
    }

    #[test]
    fn others_may_not() {
        assert!(!can_modify_recipe(&session_for(4), &recipe_by(3)));
        assert!(matches!(
            authorize_recipe_mutation(&session_for(4), &recipe_by(3)),
            Err(Error::Unauthorized(_))
        ));
    }
}
