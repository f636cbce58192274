use bson::oid::ObjectId;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        // Absurd page numbers land past the end instead of overflowing.
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

/// `?id=` naming a user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UserQuery {
    pub id: Option<String>,
}

impl UserQuery {
    pub fn user_id(&self) -> AppResult<&str> {
        require_param(self.id.as_deref(), "user id")
    }
}

/// `?id=<product>&userID=<user>`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductUserQuery {
    pub id: Option<String>,
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
}

impl ProductUserQuery {
    pub fn ids(&self) -> AppResult<(&str, &str)> {
        let product_id = require_param(self.id.as_deref(), "product id")?;
        let user_id = require_param(self.user_id.as_deref(), "user id")?;
        Ok((product_id, user_id))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchQuery {
    pub name: Option<String>,
}

/// A missing or blank identifier is reported as 404.
pub fn require_param<'a>(value: Option<&'a str>, name: &str) -> AppResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => {
            tracing::debug!(param = name, "required identifier missing");
            Err(AppError::NotFound(format!("{name} is empty")))
        }
    }
}

/// A malformed identifier is reported as 400.
pub fn parse_object_id(value: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(value).map_err(|_| AppError::BadRequest("Invalid ID format".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (1, 100, 0));

        let p = Pagination {
            page: Some(3),
            per_page: None,
        };
        assert_eq!(p.normalize(), (3, 20, 40));
    }

    #[test]
    fn huge_page_saturates_offset() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(100),
        };
        let (page, per_page, offset) = p.normalize();
        assert_eq!((page, per_page), (i64::MAX, 100));
        assert_eq!(offset, i64::MAX);
    }

    #[test]
    fn missing_and_malformed_ids_are_told_apart() {
        let missing = UserQuery { id: Some("  ".into()) };
        assert!(matches!(missing.user_id(), Err(AppError::NotFound(_))));

        let query = ProductUserQuery {
            id: Some("64b7f0c2a1b2c3d4e5f60718".into()),
            user_id: None,
        };
        assert!(matches!(query.ids(), Err(AppError::NotFound(_))));

        assert!(matches!(
            parse_object_id("not-an-id"),
            Err(AppError::BadRequest(_))
        ));
        assert!(parse_object_id("64b7f0c2a1b2c3d4e5f60718").is_ok());
    }
}
