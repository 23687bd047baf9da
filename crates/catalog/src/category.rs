use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainError, DomainResult, Entity, ValueObject};

/// Maximum slug length (characters).
pub const MAX_SLUG_LEN: usize = 50;

/// URL-safe category key: ASCII letters, digits, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl ValueObject for Slug {}

impl Slug {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::validation("slug cannot be empty"));
        }
        if raw.len() > MAX_SLUG_LEN {
            return Err(DomainError::validation(format!(
                "slug cannot exceed {MAX_SLUG_LEN} characters"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::validation(
                "slug may only contain letters, digits, '-' and '_'",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// Derive a slug from a display name: lowercase ASCII alphanumerics, every
    /// other run of characters collapsed into a single `-`.
    pub fn from_name(name: &str) -> DomainResult<Self> {
        let mut out = String::with_capacity(name.len());
        let mut pending_dash = false;
        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        out.truncate(MAX_SLUG_LEN);
        let out = out.trim_end_matches('-');
        Self::parse(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Slug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.0
    }
}

/// A product category, addressed by its slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating or replacing a category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

impl NewCategory {
    /// Validate the input and resolve the slug (explicit, or derived from the
    /// name when omitted).
    pub fn resolve(&self) -> DomainResult<(String, Slug)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let slug = match self.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Slug::parse(s)?,
            _ => Slug::from_name(name)?,
        };
        Ok((name.to_string(), slug))
    }

    pub fn into_category(self, id: CategoryId) -> DomainResult<Category> {
        let (name, slug) = self.resolve()?;
        Ok(Category { id, name, slug })
    }
}

/// Partial update (PATCH). `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

impl CategoryPatch {
    /// Resolve the name and slug the category should have after the patch.
    ///
    /// Renaming alone keeps the current slug; a blank slug is re-derived from
    /// the resulting name.
    pub fn resolve(&self, current: &Category) -> DomainResult<(String, Slug)> {
        let name = match self.name.as_deref().map(str::trim) {
            Some("") => return Err(DomainError::validation("name cannot be empty")),
            Some(n) => n.to_string(),
            None => current.name.clone(),
        };
        let slug = match self.slug.as_deref().map(str::trim) {
            Some("") => Slug::from_name(&name)?,
            Some(s) => Slug::parse(s)?,
            None => current.slug.clone(),
        };
        Ok((name, slug))
    }
}
