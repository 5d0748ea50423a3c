pub mod customer;
pub mod order;

pub use customer::{Customer, CustomerUpdate};
pub use order::{NewOrder, OrderChanges, OrderCreateRequest, OrderSummary, OrderUpdateRequest};

use std::collections::HashMap;
use thiserror::Error;

/// Field-level problems found in one request payload, keyed by wire field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("Invalid fields: {}", field_names(.0))]
pub struct ValidationError(pub HashMap<String, String>);

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    /// Non-blank value of at most `max` characters
    pub fn check_required(&mut self, field: &str, value: &str, max: usize) {
        if self.check_present(field, value) {
            self.check_length(field, value, max);
        }
    }

    /// Records a required-field error for a blank value
    pub fn check_present(&mut self, field: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.add(field, "This field is required");
            return false;
        }
        true
    }

    pub fn check_optional(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            self.check_length(field, value, max);
        }
    }

    fn check_length(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("Must be at most {} characters", max));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn field_names(errors: &HashMap<String, String>) -> String {
    let mut names: Vec<&str> = errors.keys().map(String::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}
