//! Configuration tree reader.
//!
//! Thin view over a YAML settings document. Mappings play the role of groups,
//! sequences the role of ordered lists, and everything else is a scalar. Every
//! view remembers the dotted path it was reached through so that diagnostics
//! can point at the offending entry.

use log::debug;
use serde_yaml::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Failure to read or parse the document itself. Always fatal for a load.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("I/O error while reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Document root of '{path}' is not a mapping")]
    NotAMapping { path: String },
}

/// Failure to read a single setting. Local to the entity being built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingError {
    #[error("missing required setting '{path}'")]
    Missing { path: String },
    #[error("setting '{path}' should be {expected}")]
    WrongType { path: String, expected: &'static str },
}

/// Conversion from a scalar YAML value into a typed setting.
pub trait FromSetting: Sized {
    /// Human readable description used in type errors
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromSetting for String {
    const EXPECTED: &'static str = "a string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl FromSetting for f64 {
    const EXPECTED: &'static str = "a number";

    // integers are accepted wherever a float is declared
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromSetting for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromSetting for u32 {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|v| u32::try_from(v).ok())
    }
}

impl FromSetting for u64 {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_u64()
    }
}

impl FromSetting for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

/// A parsed configuration document together with the location it was read from.
#[derive(Debug)]
pub struct ConfigTree {
    path: PathBuf,
    root: Value,
}

impl ConfigTree {
    /// Read and parse a document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse a document held in memory. `path` anchors relative path resolution.
    pub fn parse(text: &str, path: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let path = path.into();
        let root: Value = serde_yaml::from_str(text).map_err(|source| DocumentError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        let root = match root {
            // an empty document is an empty group
            Value::Null => Value::Mapping(Default::default()),
            Value::Mapping(_) => root,
            _ => {
                return Err(DocumentError::NotAMapping {
                    path: path.display().to_string(),
                })
            }
        };

        debug!("Parsed configuration document {:?}", path);
        Ok(Self { path, root })
    }

    /// Location of the document this tree was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The document's root group
    pub fn root(&self) -> Setting<'_> {
        Setting {
            value: &self.root,
            path: String::new(),
        }
    }

    /// Look up a setting by dotted path, e.g. `configuration.elements`.
    pub fn lookup(&self, dotted: &str) -> Option<Setting<'_>> {
        self.root().lookup(dotted)
    }

    /// Check whether a dotted path exists in the document.
    pub fn exists(&self, dotted: &str) -> bool {
        self.lookup(dotted).is_some()
    }

    /// Resolve a path relative to the directory containing the document.
    /// Absolute paths are returned unchanged.
    pub fn resolve_path(&self, relative_or_absolute: impl AsRef<Path>) -> PathBuf {
        let target = relative_or_absolute.as_ref();
        if target.is_absolute() {
            return target.to_path_buf();
        }
        let base = self.path.parent().unwrap_or_else(|| Path::new(""));
        normalize(&base.join(target))
    }
}

/// Drop `.` components so resolved paths print the way users wrote them.
fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// A view of one node of the tree: a group, a list or a scalar.
#[derive(Debug, Clone)]
pub struct Setting<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Setting<'a> {
    /// Dotted path of this setting from the document root
    pub fn path(&self) -> &str {
        &self.path
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    /// True if this is a group containing `key`.
    pub fn exists(&self, key: &str) -> bool {
        self.value.get(key).is_some()
    }

    /// Child setting of a group.
    pub fn child(&self, key: &str) -> Result<Setting<'a>, SettingError> {
        self.value
            .get(key)
            .map(|value| Setting {
                value,
                path: self.child_path(key),
            })
            .ok_or_else(|| SettingError::Missing {
                path: self.child_path(key),
            })
    }

    /// Walk a dotted path below this setting.
    pub fn lookup(&self, dotted: &str) -> Option<Setting<'a>> {
        let mut current = self.clone();
        for key in dotted.split('.').filter(|k| !k.is_empty()) {
            current = current.child(key).ok()?;
        }
        Some(current)
    }

    /// Read this setting as a typed scalar.
    pub fn value<T: FromSetting>(&self) -> Result<T, SettingError> {
        T::from_value(self.value).ok_or_else(|| SettingError::WrongType {
            path: self.path.clone(),
            expected: T::EXPECTED,
        })
    }

    /// Read a required typed field of this group.
    pub fn get<T: FromSetting>(&self, key: &str) -> Result<T, SettingError> {
        self.child(key)?.value()
    }

    /// Read an optional typed field. A present field of the wrong type is still an error.
    pub fn get_opt<T: FromSetting>(&self, key: &str) -> Result<Option<T>, SettingError> {
        match self.child(key) {
            Ok(child) => child.value().map(Some),
            Err(SettingError::Missing { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read an optional typed field, falling back to `default` when absent.
    pub fn get_or<T: FromSetting>(&self, key: &str, default: T) -> Result<T, SettingError> {
        Ok(self.get_opt(key)?.unwrap_or(default))
    }

    /// The ordered children of a list field.
    pub fn get_list(&self, key: &str) -> Result<SettingList<'a>, SettingError> {
        self.child(key)?.as_list()
    }

    /// Interpret this setting as an ordered list.
    pub fn as_list(&self) -> Result<SettingList<'a>, SettingError> {
        match self.value {
            Value::Sequence(items) => Ok(SettingList {
                items: items.as_slice(),
                path: self.path.clone(),
            }),
            _ => Err(SettingError::WrongType {
                path: self.path.clone(),
                expected: "a list",
            }),
        }
    }
}

/// An ordered, finite list of settings. Iterating it twice yields the same children.
#[derive(Debug, Clone)]
pub struct SettingList<'a> {
    items: &'a [Value],
    path: String,
}

impl<'a> SettingList<'a> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Setting<'a>> {
        self.items.get(index).map(|value| Setting {
            value,
            path: format!("{}[{}]", self.path, index),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Setting<'a>> + '_ {
        (0..self.items.len()).filter_map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DOC: &str = r#"
version: "1.0"
configuration:
  clocks:
    - name: "5min"
      period: 300
  timeseries:
    - name: offset
      offsetValue: 2
      ratio: 0.5
      enabled: true
"#;

    #[test]
    fn test_lookup_and_exists() {
        let tree = ConfigTree::parse(DOC, "/srv/rtx/config.yaml").unwrap();
        assert!(tree.exists("configuration.clocks"));
        assert!(!tree.exists("configuration.model"));
        assert_eq!(tree.root().get::<String>("version").unwrap(), "1.0");

        let clocks = tree.lookup("configuration.clocks").unwrap().as_list().unwrap();
        let clock = clocks.get(0).unwrap();
        assert_eq!(clock.path(), "configuration.clocks[0]");
        assert_eq!(clock.get::<u64>("period").unwrap(), 300);
    }

    #[test]
    fn test_integer_reads_as_float() {
        let tree = ConfigTree::parse(DOC, "config.yaml").unwrap();
        let ts = tree.lookup("configuration.timeseries").unwrap().as_list().unwrap();
        let entry = ts.get(0).unwrap();
        assert_eq!(entry.get::<f64>("offsetValue").unwrap(), 2.0);
        assert_eq!(entry.get::<f64>("ratio").unwrap(), 0.5);
        assert!(entry.get::<bool>("enabled").unwrap());
    }

    #[test]
    fn test_missing_and_wrong_type() {
        let tree = ConfigTree::parse(DOC, "config.yaml").unwrap();
        let ts = tree.lookup("configuration.timeseries").unwrap().as_list().unwrap();
        let entry = ts.get(0).unwrap();

        assert_eq!(
            entry.get::<String>("units"),
            Err(SettingError::Missing {
                path: "configuration.timeseries[0].units".to_string()
            })
        );
        assert!(matches!(
            entry.get::<bool>("name"),
            Err(SettingError::WrongType { .. })
        ));
        assert_eq!(entry.get_or::<f64>("window", 12.0).unwrap(), 12.0);
        assert_eq!(entry.get_opt::<String>("units").unwrap(), None);
        assert!(entry.get_opt::<u32>("name").is_err());
    }

    #[test]
    fn test_list_is_restartable() {
        let doc = "items: [a, b, c]";
        let tree = ConfigTree::parse(doc, "config.yaml").unwrap();
        let list = tree.root().get_list("items").unwrap();
        let first: Vec<String> = list.iter().map(|s| s.value::<String>().unwrap()).collect();
        let second: Vec<String> = list.iter().map(|s| s.value::<String>().unwrap()).collect();
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);
        assert!(tree.root().get_list("missing").is_err());
    }

    #[test]
    fn test_resolve_path() {
        let tree = ConfigTree::parse("", "/srv/rtx/config.yaml").unwrap();
        assert_eq!(tree.resolve_path("./data"), PathBuf::from("/srv/rtx/data"));
        assert_eq!(tree.resolve_path("models/net.inp"), PathBuf::from("/srv/rtx/models/net.inp"));
        assert_eq!(tree.resolve_path("/var/lib/rtx"), PathBuf::from("/var/lib/rtx"));

        let bare = ConfigTree::parse("", "config.yaml").unwrap();
        assert_eq!(bare.resolve_path("data"), PathBuf::from("data"));
    }

    #[test]
    fn test_document_errors() {
        assert!(matches!(
            ConfigTree::from_file("/definitely/not/here.yaml"),
            Err(DocumentError::Io { .. })
        ));
        assert!(matches!(
            ConfigTree::parse("configuration: [unclosed", "bad.yaml"),
            Err(DocumentError::Parse { .. })
        ));
        assert!(matches!(
            ConfigTree::parse("- just\n- a list\n", "list.yaml"),
            Err(DocumentError::NotAMapping { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", DOC).unwrap();

        let tree = ConfigTree::from_file(temp_file.path()).unwrap();
        assert_eq!(tree.path(), temp_file.path());
        assert!(tree.exists("configuration.timeseries"));
    }
}
