//! Product value objects.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validation::{max_chars, required_text};

/// A product image.
///
/// Two images are equal when they share a URL and a position; alt text and
/// size are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImage {
    url: String,
    alt: String,
    width: Option<u32>,
    height: Option<u32>,
    position: u32,
}

impl ProductImage {
    pub fn new(
        url: impl Into<String>,
        alt: impl Into<String>,
        position: u32,
    ) -> Result<Self, ValidationError> {
        Self {
            url: url.into(),
            alt: alt.into(),
            width: None,
            height: None,
            position,
        }
        .validated()
    }

    /// Sets the pixel size. Both sides must be positive.
    pub fn with_size(mut self, width: u32, height: u32) -> Result<Self, ValidationError> {
        self.width = Some(width);
        self.height = Some(height);
        self.validated()
    }

    pub(crate) fn validated(mut self) -> Result<Self, ValidationError> {
        self.url = required_text("url", self.url)?;
        self.alt = required_text("alt", self.alt)?;
        if self.width == Some(0) {
            return Err(ValidationError::new("width", "must be greater than zero"));
        }
        if self.height == Some(0) {
            return Err(ValidationError::new("height", "must be greater than zero"));
        }
        Ok(self)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn alt(&self) -> &str {
        &self.alt
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}

/// Compares image slots rather than full records. A product never holds two
/// images with the same URL, so comparing two `images()` lists tells callers
/// whether the gallery layout changed, regardless of alt text or size edits.
impl PartialEq for ProductImage {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.position == other.position
    }
}

impl Eq for ProductImage {}

/// Physical size and weight of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductDimensions {
    length: f64,
    width: f64,
    height: f64,
    weight: f64,
}

impl ProductDimensions {
    pub fn new(length: f64, width: f64, height: f64, weight: f64) -> Result<Self, ValidationError> {
        Self {
            length,
            width,
            height,
            weight,
        }
        .validated()
    }

    pub(crate) fn validated(self) -> Result<Self, ValidationError> {
        for (field, value) in [
            ("length", self.length),
            ("width", self.width),
            ("height", self.height),
            ("weight", self.weight),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::new(
                    field,
                    format!("must be greater than zero (got {value})"),
                ));
            }
        }
        Ok(self)
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Returns length times width times height.
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }
}

/// Longest SEO title search engines display.
pub const SEO_TITLE_MAX_CHARS: usize = 60;

/// Longest SEO description search engines display.
pub const SEO_DESCRIPTION_MAX_CHARS: usize = 160;

/// Search engine metadata for a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSeo {
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    canonical_url: Option<String>,
}

impl ProductSeo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Result<Self, ValidationError> {
        self.title = Some(title.into());
        self.validated()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Result<Self, ValidationError> {
        self.description = Some(description.into());
        self.validated()
    }

    /// Sets the keywords. Blank entries are dropped.
    pub fn with_keywords<I, K>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keywords = keywords
            .into_iter()
            .map(|k| k.into().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    pub fn with_canonical_url(mut self, url: impl Into<String>) -> Result<Self, ValidationError> {
        self.canonical_url = Some(url.into());
        self.validated()
    }

    pub(crate) fn validated(mut self) -> Result<Self, ValidationError> {
        if let Some(title) = &self.title {
            max_chars("seo.title", title, SEO_TITLE_MAX_CHARS)?;
        }
        if let Some(description) = &self.description {
            max_chars("seo.description", description, SEO_DESCRIPTION_MAX_CHARS)?;
        }
        self.canonical_url = self
            .canonical_url
            .map(|url| required_text("seo.canonical_url", url))
            .transpose()?;
        Ok(self)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn canonical_url(&self) -> Option<&str> {
        self.canonical_url.as_deref()
    }
}
