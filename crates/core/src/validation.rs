//! Validation error set.
//!
//! Input validation produces an ordered list of per-field violations, each
//! carrying its failed constraints (constraint name → message). The HTTP layer
//! folds that list into a field → messages mapping before rendering it.
//!
//! Ordering matters on the wire: fields appear in the order they were first
//! reported and each field's messages keep their constraint order.

use core::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Input that can check itself before it reaches the store.
pub trait Validate {
    /// JSON keys that must hold strings when present.
    const TEXT_FIELDS: &'static [&'static str] = &[];

    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Failed constraints for one field, in the order they were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints(Vec<(String, String)>);

impl Constraints {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.0.push((name.into(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, m)| (n.as_str(), m.as_str()))
    }

    /// Violation messages in constraint order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, m)| m.as_str())
    }
}

impl<N: Into<String>, M: Into<String>> FromIterator<(N, M)> for Constraints {
    fn from_iter<I: IntoIterator<Item = (N, M)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, m)| (n.into(), m.into())).collect())
    }
}

impl Serialize for Constraints {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, message) in &self.0 {
            map.serialize_entry(name, message)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Constraints {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ConstraintsVisitor;

        impl<'de> Visitor<'de> for ConstraintsVisitor {
            type Value = Constraints;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of constraint names to messages")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, message)) = access.next_entry::<String, String>()? {
                    out.push((name, message));
                }
                Ok(Constraints(out))
            }
        }

        deserializer.deserialize_map(ConstraintsVisitor)
    }
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub property: String,
    pub constraints: Constraints,
}

impl FieldViolation {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            constraints: Constraints::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.constraints.push(name, message);
        self
    }
}

/// Ordered sequence of per-field failures.
///
/// Serializes as `[{ "property": .., "constraints": { .. } }, ..]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldViolation>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Records a violation. Entries without constraints are dropped.
    pub fn push(&mut self, violation: FieldViolation) {
        if !violation.constraints.is_empty() {
            self.0.push(violation);
        }
    }

    /// Shorthand for a single failed constraint on `property`.
    pub fn add(
        &mut self,
        property: impl Into<String>,
        constraint: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(FieldViolation::new(property).with(constraint, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldViolation> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Fold into a field → messages mapping.
    ///
    /// Repeated properties accumulate; properties without constraints are absent.
    pub fn to_field_messages(&self) -> FieldMessages {
        let mut out = FieldMessages::default();
        for violation in &self.0 {
            out.extend(&violation.property, violation.constraints.messages());
        }
        out
    }
}

impl FromIterator<FieldViolation> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = FieldViolation>>(iter: I) -> Self {
        let mut out = Self::new();
        for v in iter {
            out.push(v);
        }
        out
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for violation in &self.0 {
            for message in violation.constraints.messages() {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                f.write_str(message)?;
            }
        }
        Ok(())
    }
}

/// Field name → ordered violation messages, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMessages(Vec<(String, Vec<String>)>);

impl FieldMessages {
    /// Append messages for `field`, creating the entry on first use.
    ///
    /// Nothing is recorded when `messages` is empty.
    pub fn extend<'a>(&mut self, field: &str, messages: impl IntoIterator<Item = &'a str>) {
        let mut messages = messages.into_iter().map(str::to_owned).peekable();
        if messages.peek().is_none() {
            return;
        }
        match self.0.iter_mut().find(|(f, _)| f == field) {
            Some((_, existing)) => existing.extend(messages),
            None => self.0.push((field.to_owned(), messages.collect())),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, m)| m.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(f, m)| (f.as_str(), m.as_slice()))
    }
}

impl Serialize for FieldMessages {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, messages) in &self.0 {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}
