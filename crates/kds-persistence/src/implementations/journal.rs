//! Append-only journal persistence backend.
//!
//! Confirms changes by appending them as JSON lines to a local file. The
//! journal is an audit artifact; nothing in the core reads it back. One
//! entry per confirmation, each with its own id and timestamp.

use crate::{PersistInterface, PersistenceError, PersistenceFactory, PersistenceRegistry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kds_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, TransitionRecord,
	ValidationError,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const DEFAULT_JOURNAL_PATH: &str = "./data/kds-journal.jsonl";

/// The change being journaled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum JournalChange {
	/// An item transition confirmation.
	#[serde(rename_all = "camelCase")]
	Transition {
		order_id: i64,
		item_id: String,
		record: TransitionRecord,
	},
	/// A pin flip confirmation.
	#[serde(rename_all = "camelCase")]
	Pin { order_id: i64, is_pinned: bool },
	/// A display-position batch confirmation.
	#[serde(rename_all = "camelCase")]
	Positions { assignments: Vec<(i64, i64)> },
}

/// One journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
	/// Unique id of this entry.
	pub id: Uuid,
	/// When the entry was appended.
	pub at: DateTime<Utc>,
	/// The confirmed change.
	#[serde(flatten)]
	pub change: JournalChange,
}

/// Journal persistence backend appending JSON lines to a file.
pub struct JournalPersistence {
	path: PathBuf,
}

impl JournalPersistence {
	/// Creates a journal writing to the given path.
	///
	/// The file and its parent directory are created on first append.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// The journal file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	async fn append(&self, change: JournalChange) -> Result<(), PersistenceError> {
		let entry = JournalEntry {
			id: Uuid::new_v4(),
			at: Utc::now(),
			change,
		};
		let mut line = serde_json::to_string(&entry)
			.map_err(|e| PersistenceError::Serialization(e.to_string()))?;
		line.push('\n');

		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				tokio::fs::create_dir_all(parent)
					.await
					.map_err(|e| PersistenceError::Io(e.to_string()))?;
			}
		}
		let mut file = tokio::fs::OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.await
			.map_err(|e| PersistenceError::Io(e.to_string()))?;
		file.write_all(line.as_bytes())
			.await
			.map_err(|e| PersistenceError::Io(e.to_string()))?;
		file.flush()
			.await
			.map_err(|e| PersistenceError::Io(e.to_string()))?;
		Ok(())
	}
}

#[async_trait]
impl PersistInterface for JournalPersistence {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(JournalPersistenceSchema)
	}

	async fn persist_transition(
		&self,
		order_id: i64,
		item_id: &str,
		record: &TransitionRecord,
	) -> Result<(), PersistenceError> {
		self.append(JournalChange::Transition {
			order_id,
			item_id: item_id.to_string(),
			record: record.clone(),
		})
		.await
	}

	async fn persist_pin(&self, order_id: i64, is_pinned: bool) -> Result<(), PersistenceError> {
		self.append(JournalChange::Pin {
			order_id,
			is_pinned,
		})
		.await
	}

	async fn persist_positions(
		&self,
		assignments: &[(i64, i64)],
	) -> Result<(), PersistenceError> {
		self.append(JournalChange::Positions {
			assignments: assignments.to_vec(),
		})
		.await
	}
}

/// Configuration schema for JournalPersistence.
pub struct JournalPersistenceSchema;

impl ConfigSchema for JournalPersistenceSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], vec![Field::new("path", FieldType::String)]);
		schema.validate(config)
	}
}

/// Factory function to create a journal persistence backend from
/// configuration.
///
/// Configuration parameters:
/// - `path`: Journal file location (default: "./data/kds-journal.jsonl")
pub fn create_persistence(
	config: &toml::Value,
) -> Result<Box<dyn PersistInterface>, PersistenceError> {
	JournalPersistenceSchema
		.validate(config)
		.map_err(|e| PersistenceError::Configuration(e.to_string()))?;
	let path = config
		.get("path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_JOURNAL_PATH)
		.to_string();
	Ok(Box::new(JournalPersistence::new(path)))
}

/// Registry for the journal persistence implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "journal";
	type Factory = PersistenceFactory;

	fn factory() -> Self::Factory {
		create_persistence
	}
}

impl PersistenceRegistry for Registry {}
