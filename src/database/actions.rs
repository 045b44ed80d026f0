pub mod ingredients;
pub mod recipes;
pub mod relations;
pub mod tags;
pub mod users;
