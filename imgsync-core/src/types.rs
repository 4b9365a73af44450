//! Domain types for image reconciliation.
//!
//! Every value here is rebuilt fresh for each reconciliation pass; nothing is
//! persisted by the core.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The cell value that marks a declared row as excluded.
pub const EXPORT_FALSE: &str = "FALSE";

// ---------------------------------------------------------------------------
// ImageRef
// ---------------------------------------------------------------------------

/// A `name:tag` image identifier.
///
/// A reference parsed without a tag is *malformed* for reconciliation: it cannot
/// be checked against a tag list, so callers route it to the failure list.
///
/// Serializes as its display string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct ImageRef {
    pub name: String,
    pub tag: Option<String>,
}

impl ImageRef {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: Some(tag.into()),
        }
    }

    /// Parse a reference as written in the inventory.
    ///
    /// The tag separator is the last `:` after the last `/`, so a registry port
    /// (`localhost:5000/app`) is never mistaken for a tag. Digest references
    /// (`app@sha256:...`) carry no tag and parse as malformed. Parsing never
    /// fails; a malformed reference keeps the trimmed input as its name.
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        let last_segment_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
        let last_segment = &reference[last_segment_start..];

        if last_segment.contains('@') {
            return Self::untagged(reference);
        }

        match last_segment.rfind(':') {
            Some(colon) => {
                let split = last_segment_start + colon;
                let name = &reference[..split];
                let tag = &reference[split + 1..];
                if name.is_empty() || tag.is_empty() {
                    Self::untagged(reference)
                } else {
                    Self {
                        name: name.to_string(),
                        tag: Some(tag.to_string()),
                    }
                }
            }
            None => Self::untagged(reference),
        }
    }

    fn untagged(reference: &str) -> Self {
        Self {
            name: reference.to_string(),
            tag: None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.tag.is_none()
    }

    /// `name:tag`, or `None` for a malformed reference.
    pub fn qualified(&self) -> Option<String> {
        self.tag.as_ref().map(|tag| format!("{}:{tag}", self.name))
    }

    /// The registry hostname prefix, when the name carries one.
    ///
    /// A first path component counts as a host when it contains a `.` or `:`
    /// or is `localhost`.
    pub fn registry_host(&self) -> Option<&str> {
        let (first, _) = self.name.split_once('/')?;
        if first.contains('.') || first.contains(':') || first == "localhost" {
            Some(first)
        } else {
            None
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{tag}", self.name),
            None => self.name.fmt(f),
        }
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ImageRef> for String {
    fn from(r: ImageRef) -> Self {
        r.to_string()
    }
}

// ---------------------------------------------------------------------------
// Declared state
// ---------------------------------------------------------------------------

/// One inventory row: a reference as read plus its export flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredImage {
    pub reference: String,
    pub export: bool,
}

impl DeclaredImage {
    /// Build from a spreadsheet row `[reference, export?, ...]`.
    ///
    /// Returns `None` when the row has no reference cell (or only whitespace).
    /// Only the exact marker `"FALSE"` excludes; any other value, or no flag
    /// cell at all, includes.
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Option<Self> {
        let reference = row.first()?.as_ref().trim();
        if reference.is_empty() {
            return None;
        }
        let export = row
            .get(1)
            .map(|flag| flag.as_ref() != EXPORT_FALSE)
            .unwrap_or(true);
        Some(Self {
            reference: reference.to_string(),
            export,
        })
    }
}

/// Declared inventory split into two disjoint, row-ordered lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredState {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl DeclaredState {
    /// Assign every row to exactly one list, preserving row order.
    pub fn from_images(images: impl IntoIterator<Item = DeclaredImage>) -> Self {
        let mut state = Self::default();
        for image in images {
            state.push(image);
        }
        state
    }

    /// Parse raw rows; rows without a reference cell are skipped.
    pub fn from_rows<R, S>(rows: &[R]) -> Self
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        Self::from_images(rows.iter().filter_map(|row| DeclaredImage::from_row(row.as_ref())))
    }

    pub fn push(&mut self, image: DeclaredImage) {
        if image.export {
            self.include.push(image.reference);
        } else {
            self.exclude.push(image.reference);
        }
    }

    /// Append another range's rows after this one's.
    pub fn extend(&mut self, other: DeclaredState) {
        self.include.extend(other.include);
        self.exclude.extend(other.exclude);
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Observed state
// ---------------------------------------------------------------------------

/// A repository and its tags as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRepository {
    pub name: String,
    pub tags: Vec<String>,
}

/// A repository whose tag list could not be read during the fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadableRepository {
    pub name: String,
    pub reason: String,
}

/// Registry contents, in catalog enumeration order (repository, then tag).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    pub repositories: Vec<ObservedRepository>,
    #[serde(default)]
    pub unreadable: Vec<UnreadableRepository>,
}

impl ObservedState {
    /// Convenience constructor used by tests and fakes.
    pub fn from_pairs<N, T, I>(repos: impl IntoIterator<Item = (N, I)>) -> Self
    where
        N: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = T>,
    {
        let mut state = Self::default();
        for (name, tags) in repos {
            state.insert(name, tags.into_iter().map(Into::into).collect());
        }
        state
    }

    pub fn insert(&mut self, name: impl Into<String>, tags: Vec<String>) {
        self.repositories.push(ObservedRepository {
            name: name.into(),
            tags,
        });
    }

    pub fn mark_unreadable(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.unreadable.push(UnreadableRepository {
            name: name.into(),
            reason: reason.into(),
        });
    }

    pub fn tags(&self, name: &str) -> Option<&[String]> {
        self.repositories
            .iter()
            .find(|repo| repo.name == name)
            .map(|repo| repo.tags.as_slice())
    }

    pub fn contains(&self, name: &str, tag: &str) -> bool {
        self.tags(name)
            .map(|tags| tags.iter().any(|t| t == tag))
            .unwrap_or(false)
    }

    /// Every stored image as an [`ImageRef`], in enumeration order.
    pub fn images(&self) -> impl Iterator<Item = ImageRef> + '_ {
        self.repositories.iter().flat_map(|repo| {
            repo.tags
                .iter()
                .map(move |tag| ImageRef::new(repo.name.clone(), tag.clone()))
        })
    }

    /// Every stored `name:tag` string, for exact-pair lookups.
    pub fn qualified_set(&self) -> HashSet<String> {
        self.repositories
            .iter()
            .flat_map(|repo| repo.tags.iter().map(move |tag| format!("{}:{tag}", repo.name)))
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.repositories.iter().map(|repo| repo.tags.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
