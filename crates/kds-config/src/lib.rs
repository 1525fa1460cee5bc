//! Configuration module for the kitchen display system.
//!
//! This module provides structures and utilities for managing KDS configuration.
//! It supports loading configuration from TOML files and provides validation to
//! ensure all required configuration values are properly set.
//!
//! Environment variables can be referenced with `${VAR_NAME}` syntax, with
//! optional defaults as `${VAR_NAME:-default_value}`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use thiserror::Error;

use kds_types::Workstation;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the kitchen display system.
///
/// This structure contains all configuration sections required for the
/// display to operate: display identity, the workstation sequence, the
/// persistence backend, and order feed sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this display instance.
	pub kds: KdsConfig,
	/// Ordered workstation definitions.
	pub stations: Vec<StationConfig>,
	/// Configuration for the persistence backend.
	pub persistence: PersistenceConfig,
	/// Configuration for order feed sources.
	#[serde(default)]
	pub feed: FeedConfig,
}

/// Configuration specific to a display instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KdsConfig {
	/// Unique identifier for this display instance.
	pub id: String,
	/// Capacity of the domain event channel.
	/// Defaults to 256 events if not specified.
	#[serde(default = "default_event_capacity")]
	pub event_capacity: usize,
}

/// Returns the default domain event channel capacity.
fn default_event_capacity() -> usize {
	256
}

/// A single workstation definition.
///
/// The `position` field controls ordering; stations with equal positions
/// keep their declaration order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationConfig {
	/// Stable workstation identifier referenced by order items.
	pub id: String,
	/// Display name shown on the board header.
	pub name: String,
	/// Sort key within the routing sequence.
	pub position: i64,
}

impl From<&StationConfig> for Workstation {
	fn from(station: &StationConfig) -> Self {
		Workstation {
			id: station.id.clone(),
			name: station.name.clone(),
			position: station.position,
		}
	}
}

/// Configuration for the persistence backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of persistence implementation names to their configurations.
	/// Each implementation has its own configuration format stored as raw TOML values.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for order feed sources.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeedConfig {
	/// Map of feed implementation names to their configurations.
	/// Each implementation has its own configuration format stored as raw TOML values.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	// Limit input size to prevent ReDoS attacks
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let Some(full_match) = cap.get(0) else { continue };
		let Some(var_name) = cap.get(1) else { continue };
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file.
	///
	/// Environment variables in the file are resolved and the configuration
	/// is validated before being returned.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path).await?;
		contents.parse()
	}

	/// Returns the configured stations as domain workstations.
	pub fn workstations(&self) -> Vec<Workstation> {
		self.stations.iter().map(Workstation::from).collect()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// This method performs validation across all configuration sections:
	/// - Ensures the display ID is not empty
	/// - Ensures at least one station is configured and station IDs are unique
	/// - Validates the persistence backend is specified and configured
	/// - Ensures at least one feed source exists
	fn validate(&self) -> Result<(), ConfigError> {
		// Validate display config
		if self.kds.id.is_empty() {
			return Err(ConfigError::Validation("KDS ID cannot be empty".into()));
		}
		if self.kds.event_capacity == 0 {
			return Err(ConfigError::Validation(
				"event_capacity must be greater than 0".into(),
			));
		}

		// Validate stations config
		if self.stations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one station must be configured".into(),
			));
		}
		let mut seen_ids = HashSet::new();
		for station in &self.stations {
			if station.id.is_empty() {
				return Err(ConfigError::Validation(
					"Station ID cannot be empty".into(),
				));
			}
			if station.name.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Station '{}' must have a name",
					station.id
				)));
			}
			if !seen_ids.insert(station.id.as_str()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate station ID '{}'",
					station.id
				)));
			}
		}

		// Validate persistence config
		if self.persistence.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one persistence implementation must be configured".into(),
			));
		}
		if self.persistence.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Persistence primary implementation cannot be empty".into(),
			));
		}
		if !self
			.persistence
			.implementations
			.contains_key(&self.persistence.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary persistence '{}' not found in implementations",
				self.persistence.primary
			)));
		}

		// Validate feed config
		if self.feed.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one feed implementation required".into(),
			));
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// This allows configuration to be parsed from TOML strings using the standard
/// string parsing interface. Environment variables are resolved and the
/// configuration is automatically validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
