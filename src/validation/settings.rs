// Named validation behaviors and per-handler overrides
use serde::{Deserialize, Serialize};

/// What happens to request properties the schema does not describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalProperties {
    /// Reject the request with a validation error.
    #[default]
    Reject,
    /// Remove the properties; the engine reports what it removed.
    Strip,
    /// Leave the request untouched.
    Allow,
}

/// The rule set handed to the schema validation engine. Defaults favor
/// strict correctness: unknown properties are rejected, no type coercion,
/// strict date and number parsing. Error text enrichment is on for
/// developer usability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Single concatenated error message enriched with the offending value
    /// and path, instead of one bare error per field.
    pub improved_error_messages: bool,
    pub coerce_types: bool,
    pub strict_dates: bool,
    pub additional_properties: AdditionalProperties,
    pub replace_values: bool,
    pub all_properties_nullable: bool,
    pub remove_null_values_from_objects: bool,
    pub remove_null_values_from_arrays: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            improved_error_messages: true,
            coerce_types: false,
            strict_dates: true,
            additional_properties: AdditionalProperties::default(),
            replace_values: false,
            all_properties_nullable: false,
            remove_null_values_from_objects: false,
            remove_null_values_from_arrays: false,
        }
    }
}

/// Per-handler overrides from the handler configuration. Any flag left
/// unset keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOverrides {
    pub improved_error_messages: Option<bool>,
    pub coerce_types: Option<bool>,
    pub strict_dates: Option<bool>,
    pub additional_properties: Option<AdditionalProperties>,
    pub replace_values: Option<bool>,
    pub all_properties_nullable: Option<bool>,
    pub remove_null_values_from_objects: Option<bool>,
    pub remove_null_values_from_arrays: Option<bool>,
}

impl ValidationOverrides {
    pub fn apply_to(&self, mut base: ValidationSettings) -> ValidationSettings {
        if let Some(v) = self.improved_error_messages {
            base.improved_error_messages = v;
        }
        if let Some(v) = self.coerce_types {
            base.coerce_types = v;
        }
        if let Some(v) = self.strict_dates {
            base.strict_dates = v;
        }
        if let Some(v) = self.additional_properties {
            base.additional_properties = v;
        }
        if let Some(v) = self.replace_values {
            base.replace_values = v;
        }
        if let Some(v) = self.all_properties_nullable {
            base.all_properties_nullable = v;
        }
        if let Some(v) = self.remove_null_values_from_objects {
            base.remove_null_values_from_objects = v;
        }
        if let Some(v) = self.remove_null_values_from_arrays {
            base.remove_null_values_from_arrays = v;
        }
        base
    }
}
