use serde::{Deserialize, Serialize};

use super::ValidationOutcome;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldState {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Per-form field tracker driving live feedback. Fields are validated
/// independently; the latest call for a field replaces its previous state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationStateManager {
    fields: Vec<(String, FieldState)>,
}

impl ValidationStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_field<V>(&mut self, name: &str, raw_value: &str, validator: V) -> String
    where
        V: Fn(&str) -> ValidationOutcome,
    {
        let outcome = validator(raw_value);
        let state = FieldState { is_valid: outcome.is_valid, errors: outcome.errors };

        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, existing)) => *existing = state,
            None => self.fields.push((name.to_string(), state)),
        }

        outcome.sanitized
    }

    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.iter().find(|(field, _)| field == name).map(|(_, state)| state)
    }

    pub fn is_field_valid(&self, name: &str) -> bool {
        self.field(name).map(|state| state.is_valid).unwrap_or(true)
    }

    /// First invalid field in the order fields were first validated, with its
    /// first message.
    pub fn first_error(&self) -> Option<(&str, &str)> {
        self.fields.iter().find(|(_, state)| !state.is_valid).map(|(field, state)| {
            (field.as_str(), state.errors.first().map(String::as_str).unwrap_or("Invalid value"))
        })
    }

    pub fn is_form_valid(&self) -> bool {
        self.fields.iter().all(|(_, state)| state.is_valid)
    }

    pub fn clear_field(&mut self, name: &str) {
        self.fields.retain(|(field, _)| field != name);
    }

    pub fn reset(&mut self) {
        self.fields.clear();
    }
}
