//! Configuration validation for pluggable backends.
//!
//! Each storage backend describes the TOML table it accepts as a [`Schema`];
//! factories validate the configured table before opening the backend and the
//! builder checks it again against the created backend's schema.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
}

impl FieldType {
	fn name(&self) -> &'static str {
		match self {
			FieldType::String => "string",
		}
	}
}

/// Custom check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator returning an error message on failure.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a TOML table.
#[derive(Debug, Default)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML table against this schema.
	///
	/// Fails on the first missing required field, type mismatch or custom
	/// validator error.
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
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn check_type(
	field_name: &str,
	value: &toml::Value,
	expected: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = || ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.name().to_string(),
		actual: value.type_str().to_string(),
	};

	match expected {
		FieldType::String => value.as_str().map(|_| ()).ok_or_else(mismatch),
	}
}

/// A configuration schema that can validate TOML values.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(input: &str) -> toml::Value {
		toml::from_str(input).unwrap()
	}

	fn path_schema() -> Schema {
		Schema::new(
			vec![Field::new("storage_path", FieldType::String)],
			vec![Field::new("label", FieldType::String)],
		)
	}

	#[test]
	fn test_valid_table() {
		let config = parse("storage_path = \"./data\"\nlabel = \"main\"");
		assert!(path_schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let err = path_schema().validate(&parse("label = \"main\"")).unwrap_err();
		assert_eq!(err, ValidationError::MissingField("storage_path".into()));
	}

	#[test]
	fn test_type_mismatch() {
		let err = path_schema()
			.validate(&parse("storage_path = 3"))
			.unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { .. }));

		let err = path_schema()
			.validate(&parse("storage_path = \"x\"\nlabel = true"))
			.unwrap_err();
		assert_eq!(
			err.to_string(),
			"Type mismatch for field 'label': expected string, got boolean"
		);
	}

	#[test]
	fn test_root_must_be_table() {
		let err = Schema::default()
			.validate(&toml::Value::String("x".into()))
			.unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { .. }));
	}

	#[test]
	fn test_custom_validator() {
		let schema = Schema::new(
			vec![Field::new("storage_path", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some("") => Err("must not be empty".to_string()),
					_ => Ok(()),
				}
			})],
			vec![],
		);
		let err = schema.validate(&parse("storage_path = \"\"")).unwrap_err();
		assert!(err.to_string().contains("must not be empty"));
	}
}
