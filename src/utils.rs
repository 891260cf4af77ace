pub mod session;

pub use session::{clear_user_session, get_current_user_id, is_logged_in, require_user, set_user_session};
