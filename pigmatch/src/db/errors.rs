use sqlx::error::DatabaseError;
use thiserror::Error;

/// The constraint a write was rejected by, as reported by PostgreSQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub constraint: Option<String>,
    pub table: Option<String>,
    pub message: String,
}

impl Violation {
    fn from_database(err: &dyn DatabaseError) -> Self {
        Self {
            constraint: err.constraint().map(str::to_string),
            table: err.table().map(str::to_string),
            message: err.message().to_string(),
        }
    }
}

/// Persistence failures that callers can act on, plus a catch-all.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Entity not found")]
    NotFound,

    #[error("Unique constraint violation: {}", .0.message)]
    UniqueViolation(Violation),

    #[error("Foreign key constraint violation: {}", .0.message)]
    ForeignKeyViolation(Violation),

    #[error("Check constraint violation: {}", .0.message)]
    CheckViolation(Violation),

    /// A stored value could not be mapped back onto the domain model
    #[error("Corrupt {column} value: {value}")]
    CorruptValue { column: &'static str, value: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DbError {
    /// Name of the violated constraint, if this is a constraint violation
    pub fn constraint(&self) -> Option<&str> {
        match self {
            DbError::UniqueViolation(v) | DbError::ForeignKeyViolation(v) | DbError::CheckViolation(v) => v.constraint.as_deref(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let sqlx::Error::Database(db_err) = &err else {
            return match err {
                sqlx::Error::RowNotFound => DbError::NotFound,
                other => DbError::Other(other.into()),
            };
        };

        let violation = || Violation::from_database(&**db_err);
        if db_err.is_unique_violation() {
            DbError::UniqueViolation(violation())
        } else if db_err.is_foreign_key_violation() {
            DbError::ForeignKeyViolation(violation())
        } else if db_err.is_check_violation() {
            DbError::CheckViolation(violation())
        } else {
            DbError::Other(err.into())
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(DbError::from(sqlx::Error::RowNotFound), DbError::NotFound));
    }

    #[test]
    fn test_non_database_errors_are_opaque() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::Other(_)));
    }

    #[test]
    fn test_constraint_accessor() {
        let err = DbError::UniqueViolation(Violation {
            constraint: Some("access_requests_one_pending".to_string()),
            table: Some("access_requests".to_string()),
            message: "duplicate key".to_string(),
        });
        assert_eq!(err.constraint(), Some("access_requests_one_pending"));
        assert_eq!(err.to_string(), "Unique constraint violation: duplicate key");
        assert_eq!(DbError::NotFound.constraint(), None);
    }
}
