//! Function declarations handed to the model.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::SchemaError;
use crate::tools::ToolKind;

const BUILTIN: &str = include_str!("../../tool_declaration.json");

/// The JSON array of function declarations, passed to the model unmodified.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSchema {
    declarations: Vec<Value>,
}

impl ToolSchema {
    /// Read declarations from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the file cannot be read, is not a JSON array of
    /// objects, or declares a name twice.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let schema = Self::from_json(&text)?;
        debug!(path = %path.display(), tools = schema.declarations.len(), "loaded tool declarations");
        Ok(schema)
    }

    /// Parse declarations from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the text is not an array of objects with a
    /// `name`, or a name is declared twice.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let declarations: Vec<serde_json::Map<String, Value>> = serde_json::from_str(text)?;
        let mut seen = HashSet::new();
        for declaration in &declarations {
            let name = declaration
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    <serde_json::Error as serde::de::Error>::missing_field("name")
                })?;
            if !seen.insert(name.to_string()) {
                return Err(SchemaError::Duplicate(name.to_string()));
            }
            if name.parse::<ToolKind>().is_err() {
                warn!(tool = name, "declared tool has no handler");
            }
        }
        Ok(Self {
            declarations: declarations.into_iter().map(Value::Object).collect(),
        })
    }

    /// Declarations compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] only if the bundled file is malformed.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_json(BUILTIN)
    }

    /// Declarations in file order.
    #[must_use]
    pub fn declarations(&self) -> &[Value] {
        &self.declarations
    }

    /// Declared tool names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.declarations
            .iter()
            .filter_map(|declaration| declaration.get("name").and_then(Value::as_str))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn builtin_declares_every_tool() {
        let schema = ToolSchema::builtin().expect("bundled schema");
        let names: Vec<&str> = schema.names().collect();
        let expected: Vec<&str> = ToolKind::ALL.iter().map(|kind| kind.name()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let text = r#"[{"name": "i_section"}, {"name": "i_section"}]"#;
        assert!(matches!(
            ToolSchema::from_json(text),
            Err(SchemaError::Duplicate(name)) if name == "i_section"
        ));
    }

    #[test]
    fn declaration_without_name_is_rejected() {
        assert!(matches!(
            ToolSchema::from_json(r#"[{"description": "nameless"}]"#),
            Err(SchemaError::Json(_))
        ));
    }

    #[test]
    fn loads_file_unmodified() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[{{"name": "plot_stress", "description": "custom", "x-extra": [1, 2]}}]"#
        )
        .expect("write");
        let schema = ToolSchema::load(file.path()).expect("loads");
        assert_eq!(schema.declarations().len(), 1);
        assert_eq!(schema.declarations()[0]["x-extra"], serde_json::json!([1, 2]));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.json");
        let error = ToolSchema::load(&path).expect_err("missing file");
        assert!(error.to_string().contains("absent.json"));
    }
}
