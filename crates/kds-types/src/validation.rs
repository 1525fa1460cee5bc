//! Configuration validation for pluggable backends.
//!
//! Backend implementations describe the TOML table they expect with a small
//! schema and validate it before construction, turning malformed
//! configuration into a precise error instead of a runtime surprise.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing from the configuration table.
	#[error("missing required field: {0}")]
	MissingField(String),
	/// A field is present but holds an out-of-range or malformed value.
	#[error("invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field holds a value of the wrong TOML type.
	#[error("type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// The TOML type a configuration field must have.
#[derive(Debug)]
pub enum FieldType {
	/// A string value.
	String,
	/// An integer value with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	/// A boolean value.
	Boolean,
	/// An array whose elements all share one type.
	Array(Box<FieldType>),
	/// A nested table validated by its own schema.
	Table(Schema),
}

/// One named field in a configuration schema.
#[derive(Debug)]
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
		}
	}
}

/// A validation schema for one backend's configuration table.
///
/// Schemas nest through [`FieldType::Table`] so hierarchical configuration
/// validates in one pass with dotted field paths in errors.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// Checks that the value is a table, that every required field is
	/// present, and that every present field matches its declared type.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			validate_field_type(&field.name, value, &field.field_type)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				validate_field_type(&field.name, value, &field.field_type)?;
			}
		}

		Ok(())
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = |expected: &str| ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	};

	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch("string"));
			}
		},
		FieldType::Integer { min, max } => {
			let int_val = value.as_integer().ok_or_else(|| mismatch("integer"))?;
			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("value {} is less than minimum {}", int_val, min_val),
					});
				}
			}
			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("value {} is greater than maximum {}", int_val, max_val),
					});
				}
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch("boolean"));
			}
		},
		FieldType::Array(inner_type) => {
			let array = value.as_array().ok_or_else(|| mismatch("array"))?;
			for (i, item) in array.iter().enumerate() {
				validate_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		},
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| prefix_field(field_name, e))?;
		},
	}

	Ok(())
}

fn prefix_field(prefix: &str, error: ValidationError) -> ValidationError {
	match error {
		ValidationError::MissingField(f) => {
			ValidationError::MissingField(format!("{}.{}", prefix, f))
		},
		ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
			field: format!("{}.{}", prefix, field),
			message,
		},
		ValidationError::TypeMismatch {
			field,
			expected,
			actual,
		} => ValidationError::TypeMismatch {
			field: format!("{}.{}", prefix, field),
			expected,
			actual,
		},
	}
}

/// Trait for backends that can validate their own configuration table.
pub trait ConfigSchema: Send + Sync {
	/// Validates a TOML configuration value against this backend's schema.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("path", FieldType::String)],
			vec![Field::new(
				"replay_count",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			)],
		)
	}

	#[test]
	fn accepts_valid_table() {
		let config: toml::Value = toml::from_str("path = \"orders.json\"\nreplay_count = 2").unwrap();
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn reports_missing_required_field() {
		let config: toml::Value = toml::from_str("replay_count = 2").unwrap();
		let err = schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "path"));
	}

	#[test]
	fn reports_out_of_range_integer() {
		let config: toml::Value = toml::from_str("path = \"x\"\nreplay_count = 0").unwrap();
		let err = schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { field, .. } if field == "replay_count"));
	}

	#[test]
	fn nested_table_errors_carry_dotted_paths() {
		let outer = Schema::new(
			vec![Field::new("fixture", FieldType::Table(schema()))],
			vec![],
		);
		let config: toml::Value = toml::from_str("[fixture]\nreplay_count = 2").unwrap();
		let err = outer.validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "fixture.path"));
	}
}
