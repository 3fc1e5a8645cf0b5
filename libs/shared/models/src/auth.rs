use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Authenticated user as handed over by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Professional,
    CompanyEmployee,
    Admin,
}

impl Role {
    /// Professionals and company employees perform the booked service.
    pub fn is_provider_side(&self) -> bool {
        matches!(self, Role::Professional | Role::CompanyEmployee)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" | "customer" => Some(Role::Client),
            "professional" | "provider" => Some(Role::Professional),
            "company_employee" | "employee" => Some(Role::CompanyEmployee),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Professional => write!(f, "professional"),
            Role::CompanyEmployee => write!(f, "company_employee"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// The acting party of a core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn client(id: Uuid) -> Self {
        Self::new(id, Role::Client)
    }

    pub fn professional(id: Uuid) -> Self {
        Self::new(id, Role::Professional)
    }

    pub fn company_employee(id: Uuid) -> Self {
        Self::new(id, Role::CompanyEmployee)
    }

    pub fn admin(id: Uuid) -> Self {
        Self::new(id, Role::Admin)
    }
}

impl TryFrom<&User> for Actor {
    type Error = AppError;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::BadRequest(format!("Invalid user id: {}", user.id)))?;

        let role = user.role.as_deref()
            .and_then(Role::parse)
            .ok_or_else(|| AppError::Forbidden("User has no recognised role".to_string()))?;

        Ok(Actor { id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn user_with_role(role: Option<&str>) -> User {
        User {
            id: Uuid::new_v4().to_string(),
            email: Some("someone@example.com".to_string()),
            role: role.map(str::to_string),
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn test_actor_from_user() {
        let user = user_with_role(Some("company_employee"));
        let actor = Actor::try_from(&user).unwrap();

        assert_eq!(actor.role, Role::CompanyEmployee);
        assert!(actor.role.is_provider_side());
        assert_eq!(actor.id.to_string(), user.id);
    }

    #[test]
    fn test_actor_requires_role() {
        let user = user_with_role(None);
        assert_matches!(Actor::try_from(&user), Err(AppError::Forbidden(_)));

        let user = user_with_role(Some("superuser"));
        assert_matches!(Actor::try_from(&user), Err(AppError::Forbidden(_)));
    }

    #[test]
    fn test_actor_requires_uuid() {
        let mut user = user_with_role(Some("client"));
        user.id = "not-a-uuid".to_string();

        assert_matches!(Actor::try_from(&user), Err(AppError::BadRequest(_)));
    }
}
