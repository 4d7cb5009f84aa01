//! Domain collection records
//!
//! Articles, pet foods, and pets share one CRUD pattern: an id assigned on
//! creation, domain fields, and the identity of the user who posted them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A record that lives in a role-gated collection.
pub trait CollectionRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name, used for storage keys and default route prefixes
    const COLLECTION: &'static str;

    /// Fields supplied by the caller when creating an item
    type Draft: Clone + Serialize + Send + Sync;

    /// Partial update; `None` fields are left untouched
    type Patch: Clone + Serialize + Send + Sync;

    fn id(&self) -> &str;

    fn posted_by(&self) -> &str;

    fn from_draft(id: String, posted_by: String, draft: Self::Draft) -> Self;

    fn validate_draft(draft: &Self::Draft) -> Result<()>;
}

fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

fn require_price(price: f64) -> Result<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(Error::Validation(
            "Price must be a non-negative number".to_string(),
        ))
    }
}

/// A news column article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    /// ISO-8601 publication date
    pub date: String,
    #[serde(default)]
    pub posted_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    pub summary: String,
    pub body: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Article {
    /// First 100 characters of the body, with an ellipsis when truncated.
    pub fn excerpt(&self) -> String {
        let mut excerpt: String = self.body.chars().take(100).collect();
        if self.body.chars().count() > 100 {
            excerpt.push_str("...");
        }
        excerpt
    }
}

impl CollectionRecord for Article {
    const COLLECTION: &'static str = "articles";
    type Draft = ArticleDraft;
    type Patch = ArticlePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn posted_by(&self) -> &str {
        &self.posted_by
    }

    fn from_draft(id: String, posted_by: String, draft: Self::Draft) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            summary: draft.summary.trim().to_string(),
            body: draft.body.trim().to_string(),
            date: draft
                .date
                .and_then(|date| crate::util::normalize_text_option(Some(date)))
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            posted_by,
        }
    }

    fn validate_draft(draft: &Self::Draft) -> Result<()> {
        if draft.title.trim().is_empty()
            || draft.summary.trim().is_empty()
            || draft.body.trim().is_empty()
        {
            return Err(Error::Validation(
                "Title, summary, and body are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// A pet food product in the shop catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetFood {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub posted_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetFoodDraft {
    pub name: String,
    pub price: f64,
    pub description: String,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetFoodPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl CollectionRecord for PetFood {
    const COLLECTION: &'static str = "pet-foods";
    type Draft = PetFoodDraft;
    type Patch = PetFoodPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn posted_by(&self) -> &str {
        &self.posted_by
    }

    fn from_draft(id: String, posted_by: String, draft: Self::Draft) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            price: draft.price,
            description: draft.description.trim().to_string(),
            image_path: crate::util::normalize_text_option(draft.image_path),
            posted_by,
        }
    }

    fn validate_draft(draft: &Self::Draft) -> Result<()> {
        require_text(&draft.name, "Name")?;
        require_price(draft.price)
    }
}

/// A pet listed by the shop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(alias = "type")]
    pub species: String,
    pub price: f64,
    #[serde(default)]
    pub posted_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetDraft {
    pub name: String,
    pub species: String,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl CollectionRecord for Pet {
    const COLLECTION: &'static str = "pets";
    type Draft = PetDraft;
    type Patch = PetPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn posted_by(&self) -> &str {
        &self.posted_by
    }

    fn from_draft(id: String, posted_by: String, draft: Self::Draft) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            species: draft.species.trim().to_string(),
            price: draft.price,
            posted_by,
        }
    }

    fn validate_draft(draft: &Self::Draft) -> Result<()> {
        require_text(&draft.name, "Name")?;
        require_text(&draft.species, "Species")?;
        require_price(draft.price)
    }
}
