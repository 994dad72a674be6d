//! User entity and its input rules.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::id::UserId;
use crate::validation::{FieldViolation, Validate, ValidationErrors};

const NAME_MIN: usize = 3;
const NAME_MAX: usize = 20;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 20;

/// A stored user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build a fresh record from validated input.
    pub fn create(id: UserId, input: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id,
            first_name: input.first_name,
            last_name: input.last_name,
            username: input.username,
            email: input.email,
            password: input.password,
            created_at: now,
            updated_at: None,
        }
    }

    /// Merge a patch into this record, bumping `updated_at`.
    pub fn apply(&mut self, patch: UserPatch, now: DateTime<Utc>) {
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        self.updated_at = Some(now);
    }
}

/// Payload for creating a user.
///
/// Missing fields deserialize as empty strings so they surface as
/// validation failures instead of parse errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Validate for NewUser {
    const TEXT_FIELDS: &'static [&'static str] =
        &["firstName", "lastName", "username", "email", "password"];

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.push(required_length("firstName", &self.first_name, NAME_MIN, NAME_MAX));
        errors.push(required_length("lastName", &self.last_name, NAME_MIN, NAME_MAX));
        errors.push(required_length("username", &self.username, NAME_MIN, NAME_MAX));
        errors.push(required_email("email", &self.email));
        errors.push(required_length("password", &self.password, PASSWORD_MIN, PASSWORD_MAX));
        errors.into_result()
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Validate for UserPatch {
    const TEXT_FIELDS: &'static [&'static str] = &["username", "email", "password"];

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(username) = &self.username {
            errors.push(length("username", username, NAME_MIN, NAME_MAX));
        }
        if let Some(email) = &self.email {
            errors.push(email_format("email", email));
        }
        if let Some(password) = &self.password {
            errors.push(length("password", password, PASSWORD_MIN, PASSWORD_MAX));
        }
        errors.into_result()
    }
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password.is_none()
    }
}

fn required_length(field: &str, value: &str, min: usize, max: usize) -> FieldViolation {
    let mut v = FieldViolation::new(field);
    if value.trim().is_empty() {
        v = v.with("isNotEmpty", format!("{field} should not be empty"));
    }
    merge(v, length(field, value, min, max))
}

fn required_email(field: &str, value: &str) -> FieldViolation {
    let mut v = FieldViolation::new(field);
    if value.trim().is_empty() {
        v = v.with("isNotEmpty", format!("{field} should not be empty"));
    }
    merge(v, email_format(field, value))
}

fn length(field: &str, value: &str, min: usize, max: usize) -> FieldViolation {
    let n = value.chars().count();
    let v = FieldViolation::new(field);
    if n < min {
        v.with(
            "isLength",
            format!("{field} must be longer than or equal to {min} characters"),
        )
    } else if n > max {
        v.with(
            "isLength",
            format!("{field} must be shorter than or equal to {max} characters"),
        )
    } else {
        v
    }
}

fn email_format(field: &str, value: &str) -> FieldViolation {
    let v = FieldViolation::new(field);
    if is_email(value) {
        v
    } else {
        v.with("isEmail", format!("{field} must be an email"))
    }
}

fn merge(mut into: FieldViolation, from: FieldViolation) -> FieldViolation {
    for (name, message) in from.constraints.iter() {
        into.constraints.push(name, message);
    }
    into
}

/// Pragmatic address check: one `@`, non-empty local part, dotted domain,
/// no whitespace.
fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        && labels.last().is_some_and(|tld| tld.len() >= 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> NewUser {
        NewUser {
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            username: "john_doe".to_string(),
            email: "john.doe@example.com".to_string(),
            password: "strongpassword123".to_string(),
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn reports_each_invalid_field_once() {
        let input = NewUser {
            email: "not-an-email".to_string(),
            password: "abc".to_string(),
            ..valid_input()
        };

        let fields = input.validate().unwrap_err().to_field_messages();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("email").unwrap(), ["email must be an email"]);
        assert_eq!(
            fields.get("password").unwrap(),
            ["password must be longer than or equal to 6 characters"]
        );
    }

    #[test]
    fn empty_field_collects_every_failed_constraint() {
        let input = NewUser {
            first_name: String::new(),
            ..valid_input()
        };

        let fields = input.validate().unwrap_err().to_field_messages();
        assert_eq!(
            fields.get("firstName").unwrap(),
            [
                "firstName should not be empty",
                "firstName must be longer than or equal to 3 characters"
            ]
        );
    }

    #[test]
    fn missing_fields_deserialize_as_empty() {
        let input: NewUser = serde_json::from_str(r#"{"firstName":"Jane"}"#).unwrap();
        let errors = input.validate().unwrap_err();
        let fields = errors.to_field_messages();
        assert!(fields.get("firstName").is_none());
        assert_eq!(
            fields.iter().map(|(f, _)| f).collect::<Vec<_>>(),
            ["lastName", "username", "email", "password"]
        );
    }

    #[test]
    fn patch_only_checks_present_fields() {
        let patch = UserPatch {
            username: Some("ab".to_string()),
            ..UserPatch::default()
        };
        let fields = patch.validate().unwrap_err().to_field_messages();
        assert_eq!(fields.len(), 1);
        assert!(UserPatch::default().validate().is_ok());
    }

    #[test]
    fn apply_merges_and_stamps_update_time() {
        let now = Utc::now();
        let mut user = User::create(UserId::new(), valid_input(), now);
        user.apply(
            UserPatch {
                email: Some("new.email@example.com".to_string()),
                ..UserPatch::default()
            },
            now,
        );
        assert_eq!(user.email, "new.email@example.com");
        assert_eq!(user.username, "john_doe");
        assert_eq!(user.updated_at, Some(now));
    }

    #[test]
    fn email_check() {
        assert!(is_email("a@b.io"));
        assert!(is_email("first.last+tag@sub.example.com"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("a b@example.com"));
        assert!(!is_email("a@@example.com"));
        assert!(!is_email("a@example.c"));
    }
}
