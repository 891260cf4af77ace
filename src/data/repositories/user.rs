use crate::data::models::NewUser;
use crate::data::models::User;
use crate::engine::UserSettings;
use crate::schema::users;
use bcrypt::verify;
use bcrypt::hash;
use diesel::prelude::*;

pub struct UserRepository;

impl UserRepository {
    pub fn find_by_email(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> Result<Option<User>, diesel::result::Error> {
        users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first::<User>(conn)
            .optional()
    }

    pub fn verify_password(
        stored_hash: &str,
        input_password: &str,
    ) -> Result<bool, bcrypt::BcryptError> {
        verify(input_password, stored_hash)
    }

    /// Hashes the password and stores the user with default settings.
    pub fn create_user(
        conn: &mut SqliteConnection,
        email: &str,
        password: &str,
        cost: u32,
    ) -> Result<User, crate::data::models::RegisterError> {
        let hashed_password = hash(password, cost)?;
        let settings = serde_json::to_string(&UserSettings::default())?;

        diesel::insert_into(users::table)
            .values(&NewUser {
                email,
                password: &hashed_password,
                settings_json: &settings,
            })
            .execute(conn)?;

        Ok(users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first::<User>(conn)?)
    }

    pub fn email_exists(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> Result<bool, diesel::result::Error> {
        use diesel::dsl::exists;
        use diesel::select;

        select(exists(users::table.filter(users::email.eq(email)))).get_result(conn)
    }
}
