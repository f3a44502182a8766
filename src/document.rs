//! Document Loader.
//!
//! Documents are markdown files one level below a category directory:
//! `<root>/<category>/<name>.md` has slug `category/name`. Nothing is cached;
//! every call reads the tree again.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const EXCERPT_MAX_CHARS: usize = 150;
const EXTENSION: &str = "md";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub slug: String,
    pub title: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub slug: String,
    pub title: String,
    pub category: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub excerpt: String,
}

impl Document {
    pub fn meta(&self) -> DocumentMeta {
        DocumentMeta {
            slug: self.slug.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            excerpt: self.excerpt.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    root: PathBuf,
}

impl DocumentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Category directory names, sorted.
    pub fn categories(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut categories = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !follows_to(&entry.path(), fs::Metadata::is_dir) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                categories.push(name.to_string());
            }
        }
        categories.sort();
        Ok(categories)
    }

    /// Every document's metadata, most recently modified first. A missing
    /// root yields an empty list.
    pub fn list_all(&self) -> Result<Vec<DocumentMeta>> {
        let mut documents = Vec::new();
        for category in self.categories()? {
            let dir = self.root.join(&category);
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if !is_markdown(&path) || !follows_to(&path, fs::Metadata::is_file) {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                    continue;
                };
                let document = read_document(&path, &category, name)?;
                documents.push(document.meta());
            }
        }
        documents.sort_by(|left, right| {
            right
                .updated_at
                .cmp(&left.updated_at)
                .then_with(|| left.slug.cmp(&right.slug))
        });
        tracing::debug!(root = %self.root.display(), count = documents.len(), "listed documents");
        Ok(documents)
    }

    /// One document by `category/name` slug. Unknown slugs, malformed slugs
    /// and slugs that try to leave the root all resolve to `None`.
    pub fn get(&self, slug: &str) -> Result<Option<Document>> {
        let Some((category, name)) = split_slug(slug) else {
            return Ok(None);
        };
        let path = self.root.join(category).join(format!("{name}.{EXTENSION}"));
        if !path.is_file() {
            return Ok(None);
        }
        read_document(&path, category, name).map(Some)
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(EXTENSION)
}

fn split_slug(slug: &str) -> Option<(&str, &str)> {
    let (category, name) = slug.split_once('/')?;
    if !is_plain_segment(category) || !is_plain_segment(name) {
        return None;
    }
    Some((category, name))
}

fn is_plain_segment(segment: &str) -> bool {
    if segment.is_empty() || segment.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn read_document(path: &Path, category: &str, name: &str) -> Result<Document> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let metadata = fs::metadata(path)?;
    let updated = metadata.modified()?;
    let created = metadata.created().unwrap_or(updated);

    Ok(Document {
        slug: format!("{category}/{name}"),
        title: extract_title(&content).unwrap_or_else(|| name.replace('-', " ")),
        category: category.to_string(),
        excerpt: extract_excerpt(&content),
        created_at: to_utc(created),
        updated_at: to_utc(updated),
        content,
    })
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Checks the link target, so symlinked categories and files are listed the
/// same way `get` resolves them. Dangling links count as absent.
fn follows_to(path: &Path, check: fn(&fs::Metadata) -> bool) -> bool {
    fs::metadata(path).map(|meta| check(&meta)).unwrap_or(false)
}

/// Text of the first `# heading` line. `## sub` headings do not count.
pub fn extract_title(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix('#')?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let text = rest.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

/// First paragraph after an optional leading heading line, capped at
/// [`EXCERPT_MAX_CHARS`] characters.
pub fn extract_excerpt(content: &str) -> String {
    let body = match content.strip_prefix('#') {
        Some(rest) => match rest.split_once('\n') {
            Some((heading, after)) if !heading.is_empty() => after,
            _ => content,
        },
        None => content,
    };
    let body = body.trim();
    let paragraph = body.split("\n\n").next().unwrap_or_default();
    paragraph.chars().take(EXCERPT_MAX_CHARS).collect()
}
