use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::engine_debug;
use newsroom_core::{read_source_field, render_document, Language, PostMetadata};

use crate::persist::{AtomicFileWriter, PersistError};

const DOCUMENT_EXTENSION: &str = "md";

/// Writes one document per (language, slug) under `content/<lang>/posts`.
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    content_root: PathBuf,
}

impl DocumentWriter {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
        }
    }

    pub fn namespace_dir(&self, language: Language) -> PathBuf {
        self.content_root.join(language.code()).join("posts")
    }

    /// Replace `<slug>.md` in the language namespace. The previous file stays
    /// intact if anything fails before the final rename.
    pub fn write(
        &self,
        language: Language,
        slug: &str,
        metadata: &PostMetadata,
        body: &str,
    ) -> Result<PathBuf, PersistError> {
        let document = render_document(metadata, body);
        let writer = AtomicFileWriter::new(self.namespace_dir(language));
        writer.write_str(&format!("{slug}.{DOCUMENT_EXTENSION}"), &document)
    }

    /// Slugs of every document in any namespace, with the link each was
    /// written for when the document records one.
    pub fn existing_slugs(&self) -> Vec<(String, Option<String>)> {
        Language::ALL
            .into_iter()
            .flat_map(|language| documents_in(&self.namespace_dir(language)))
            .collect()
    }
}

fn documents_in(dir: &Path) -> Vec<(String, Option<String>)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION))
        .filter_map(|path| {
            let slug = path.file_stem()?.to_str()?.to_string();
            let owner = match fs::read_to_string(&path) {
                Ok(content) => read_source_field(&content),
                Err(err) => {
                    engine_debug!("cannot read {}: {err}", path.display());
                    None
                }
            };
            Some((slug, owner))
        })
        .collect()
}
