//! `userdesk-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the user entity, its input validation rules and the validation error set
//! that the HTTP layer renders into field→messages mappings.

pub mod error;
pub mod id;
pub mod user;
pub mod validation;

pub use error::{DomainError, DomainResult};
pub use id::UserId;
pub use user::{NewUser, User, UserPatch};
pub use validation::{Constraints, FieldMessages, FieldViolation, Validate, ValidationErrors};
