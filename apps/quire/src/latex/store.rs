//! Named LaTeX templates, parsed once at startup.
//!
//! Built-in templates are compiled into the binary. An optional directory adds
//! `<name>.tex` files and overrides built-ins with the same name.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::latex::template::{Template, TemplateError};

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "resume_classic",
        include_str!("../../templates/resume_classic.tex"),
    ),
    ("cover_letter", include_str!("../../templates/cover_letter.tex")),
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read template directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, Template>,
}

impl TemplateStore {
    /// Store holding only the built-in templates.
    pub fn builtin() -> Result<Self, StoreError> {
        let mut store = Self::default();
        for (name, source) in BUILTIN_TEMPLATES {
            store.insert(Template::parse(*name, source)?);
        }
        Ok(store)
    }

    /// Built-ins plus every `*.tex` file in `dir`. Any malformed template fails the load.
    pub fn load(dir: Option<&Path>) -> Result<Self, StoreError> {
        let mut store = Self::builtin()?;
        let Some(dir) = dir else {
            return Ok(store);
        };

        let io_err = |source: io::Error| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "tex"))
            .collect();
        paths.sort();

        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if store.templates.contains_key(name) {
                debug!(template = name, path = %path.display(), "Overriding template");
            }
            store.insert(Template::parse(name, &source)?);
        }

        info!(
            count = store.templates.len(),
            dir = %dir.display(),
            "Templates loaded"
        );
        Ok(store)
    }

    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.name().to_string(), template);
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_builtins_parse() {
        let store = TemplateStore::builtin().expect("built-in templates parse");
        assert_eq!(store.names(), vec!["cover_letter", "resume_classic"]);
    }

    #[test]
    fn test_builtin_resume_substitutes_and_escapes() {
        let store = TemplateStore::builtin().unwrap();
        let data = json!({
            "contact": {"name": "Ada Lovelace", "email": "ada@example.com", "links": ["ada.dev"]},
            "summary": "Numbers & engines",
            "experience": [{
                "title": "Analyst", "company": "Babbage_Co", "start": "1842", "end": "1843",
                "bullets": ["Cut cost by 50%"]
            }],
            "education": [],
            "skills": ["Maths", "C#"]
        });
        let tex = store.get("resume_classic").unwrap().render(&data);

        assert!(tex.contains("{\\LARGE\\bfseries Ada Lovelace}"));
        assert!(tex.contains("\\url{ada.dev}"));
        assert!(tex.contains("Numbers \\& engines"));
        assert!(tex.contains("\\entry{Analyst}{Babbage\\_Co}{}{1842 -- 1843}"));
        assert!(tex.contains("\\highlight{Cut cost by 50\\%}"));
        assert!(tex.contains("C\\#"));
        assert!(!tex.contains("{{"), "no unresolved tags should remain");
    }

    #[test]
    fn test_builtin_cover_letter_renders_paragraphs() {
        let store = TemplateStore::builtin().unwrap();
        let data = json!({
            "sender": {"name": "Ada"},
            "paragraphs": ["First.", "Second."],
            "closing": "Regards,"
        });
        let tex = store.get("cover_letter").unwrap().render(&data);
        assert!(tex.contains("First.\\par\nSecond.\\par"));
        assert!(tex.contains("Regards,"));
    }

    #[test]
    fn test_directory_templates_add_and_override() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("memo.tex"), "Memo for {{name}}").unwrap();
        std::fs::write(dir.path().join("cover_letter.tex"), "custom {{name}}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "{{#broken}}").unwrap();

        let store = TemplateStore::load(Some(dir.path())).expect("load");
        assert_eq!(
            store.names(),
            vec!["cover_letter", "memo", "resume_classic"]
        );
        assert_eq!(
            store.get("cover_letter").unwrap().render(&json!({"name": "x"})),
            "custom x"
        );
    }

    #[test]
    fn test_malformed_directory_template_fails_load() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("bad.tex"), "{{#items}} never closed").unwrap();
        let err = TemplateStore::load(Some(dir.path())).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Template(TemplateError::UnclosedSection { .. })
        ));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("nope");
        assert!(matches!(
            TemplateStore::load(Some(&missing)),
            Err(StoreError::Io { .. })
        ));
    }
}
