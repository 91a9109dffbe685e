use demurrage::database::DatabaseError;

pub mod company;
pub mod session;
pub mod stop_event;
pub mod user;
pub mod vehicle;
pub mod weekly;

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        sqlx::Error::Database(ref error) if error.is_unique_violation() => {
            DatabaseError::Conflict
        }
        sqlx::Error::Database(ref error) if error.is_foreign_key_violation() => {
            DatabaseError::NotFound
        }
        _ => DatabaseError::Other(Box::new(why)),
    }
}
