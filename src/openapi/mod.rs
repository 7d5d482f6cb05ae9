//! Typed OpenAPI views built over the positioned [`Document`].

pub mod doctor;
pub mod index;

pub use doctor::DoctorDocument;
pub use index::SpecIndex;

use crate::document::{Document, View};
use serde::{Deserialize, Serialize};

pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Specification dialect a document is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecFormat {
    #[serde(rename = "oas2")]
    Oas2,
    #[serde(rename = "oas3_0")]
    Oas3_0,
    #[serde(rename = "oas3_1")]
    Oas3_1,
    #[serde(rename = "unknown")]
    Unknown,
}

impl SpecFormat {
    /// Whether a rule's `formats` entry applies to this dialect
    pub fn matches(&self, format: &str) -> bool {
        match format.trim().to_ascii_lowercase().as_str() {
            "oas2" | "swagger" | "swagger2" => *self == SpecFormat::Oas2,
            "oas3" => self.is_oas3(),
            "oas3_0" | "oas3.0" => *self == SpecFormat::Oas3_0,
            "oas3_1" | "oas3.1" => *self == SpecFormat::Oas3_1,
            _ => false,
        }
    }

    pub fn is_oas3(&self) -> bool {
        matches!(self, SpecFormat::Oas3_0 | SpecFormat::Oas3_1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Yaml,
    Json,
}

/// What kind of spec was handed to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecInfo {
    pub format: SpecFormat,
    /// Declared `swagger` / `openapi` version
    pub version: String,
    /// `openapi` or `swagger`; empty when neither key is present
    pub spec_type: String,
    pub file_type: FileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SpecInfo {
    pub fn detect(document: &Document, bytes: &[u8]) -> Self {
        let file_type = match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => FileType::Json,
            _ => FileType::Yaml,
        };

        let root = document.root(View::Unresolved);
        let read = |key: &str| root.and_then(|r| document.get_str(r, key)).map(str::to_string);
        let title = root
            .and_then(|r| document.get(r, "info"))
            .and_then(|info| document.get_str(info, "title"))
            .map(str::to_string);

        let (format, version, spec_type) = if let Some(version) = read("openapi") {
            let format = if version.starts_with("3.0") {
                SpecFormat::Oas3_0
            } else if version.starts_with("3.1") {
                SpecFormat::Oas3_1
            } else {
                SpecFormat::Unknown
            };
            (format, version, "openapi".to_string())
        } else if let Some(version) = read("swagger") {
            let format = if version == "2.0" || version == "2" {
                SpecFormat::Oas2
            } else {
                SpecFormat::Unknown
            };
            (format, version, "swagger".to_string())
        } else {
            (SpecFormat::Unknown, String::new(), String::new())
        };

        Self {
            format,
            version,
            spec_type,
            file_type,
            title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(source: &str) -> SpecInfo {
        let doc = Document::parse(source.as_bytes(), "spec").unwrap();
        SpecInfo::detect(&doc, source.as_bytes())
    }

    #[test]
    fn test_detect_versions() {
        assert_eq!(info("swagger: '2.0'\n").format, SpecFormat::Oas2);
        assert_eq!(info("swagger: 2.0\n").format, SpecFormat::Oas2);
        assert_eq!(info("openapi: 3.0.3\n").format, SpecFormat::Oas3_0);
        assert_eq!(info("openapi: 3.1.0\n").format, SpecFormat::Oas3_1);
        assert_eq!(info("openapi: 4.0.0\n").format, SpecFormat::Unknown);
        assert_eq!(info("asyncapi: 2.0.0\n").spec_type, "");
    }

    #[test]
    fn test_detect_file_type_and_title() {
        let detected = info(r#"{"openapi": "3.1.0", "info": {"title": "Pets"}}"#);
        assert_eq!(detected.file_type, FileType::Json);
        assert_eq!(detected.title.as_deref(), Some("Pets"));
    }

    #[test]
    fn test_format_matching() {
        assert!(SpecFormat::Oas3_1.matches("oas3"));
        assert!(SpecFormat::Oas3_0.matches("oas3_0"));
        assert!(!SpecFormat::Oas3_0.matches("oas3_1"));
        assert!(SpecFormat::Oas2.matches("oas2"));
        assert!(!SpecFormat::Unknown.matches("oas3"));
    }
}
