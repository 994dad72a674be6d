use serde::Deserialize;
use serde_json::{Value, json};

use userdesk_core::{DomainResult, FieldViolation, User, UserId, Validate, ValidationErrors};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct DeleteManyRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

impl DeleteManyRequest {
    pub fn user_ids(&self) -> DomainResult<Vec<UserId>> {
        self.ids.iter().map(|raw| raw.parse()).collect()
    }
}

impl Validate for DeleteManyRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut ids = FieldViolation::new("ids");
        if self.ids.is_empty() {
            ids = ids.with("arrayNotEmpty", "ids should not be empty");
        }
        if self.ids.iter().any(|raw| raw.parse::<UserId>().is_err()) {
            ids = ids.with("isUuid", "each value in ids must be a UUID");
        }
        let mut errors = ValidationErrors::new();
        errors.push(ids);
        errors.into_result()
    }
}

// -------------------------
// Response mapping helpers
// -------------------------

/// Public view of a user. The password never leaves the service.
pub fn user_to_json(user: &User) -> Value {
    json!({
        "id": user.id.to_string(),
        "firstName": user.first_name,
        "lastName": user.last_name,
        "username": user.username,
        "email": user.email,
        "createdAt": user.created_at,
        "updatedAt": user.updated_at,
    })
}

pub fn users_to_json(users: &[User]) -> Value {
    Value::Array(users.iter().map(user_to_json).collect())
}
