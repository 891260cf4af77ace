pub mod api_models;
pub mod auth_models;
pub mod deck_models;
pub mod srs_models;
pub mod user_models;

pub use api_models::ApiError;
pub use auth_models::{LoginError, LoginForm, RegisterError, RegisterForm, SessionUser};
pub use deck_models::{CreateDeckRequest, DeckCreated, DeckRow, OccurrenceRow};
pub use srs_models::{
    AnswerRequest, CardRequest, CardRow, CardStateRow, ImportKnownRequest, LemmaRequest, ReviewLogRow,
};
pub use user_models::{NewUser, User};
