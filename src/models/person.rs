//! Person aggregate: scalar identity fields plus typed child collections.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Declared gender of a person.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Any other declaration.
    Other,
}

/// Kind of a single contact handle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    /// Mobile phone number.
    Mobile,
    /// `WhatsApp` number.
    Whatsapp,
    /// Facebook profile link.
    Facebook,
    /// Personal or business website link.
    Website,
}

/// Hosted profile image reference with an inline preview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ProfileImage {
    /// URL returned by the asset-hosting service.
    pub url: String,
    /// Base64-encoded preview bytes for offline rendering.
    pub preview_data: String,
}

/// Caller-supplied person payload: every field the caller controls.
///
/// The four contact lists and the document URL list always carry the
/// complete desired child set; updates replace children wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PersonDraft {
    /// Full legal name.
    pub full_name: String,
    /// Father's name.
    pub father_name: String,
    /// Mother's name.
    pub mother_name: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Declared gender.
    pub gender: Gender,
    /// National identity number.
    pub national_id: String,
    /// Voter registration number.
    #[serde(default)]
    pub voter_number: Option<String>,
    /// Permanent address.
    pub permanent_address: String,
    /// Present address.
    pub present_address: String,
    /// Hosted profile image, if one was uploaded.
    #[serde(default)]
    pub profile_image: Option<ProfileImage>,
    /// Free-text notes.
    #[serde(default)]
    pub description: Option<String>,
    /// Mobile phone numbers.
    #[serde(default)]
    pub mobile_numbers: Vec<String>,
    /// `WhatsApp` numbers.
    #[serde(default)]
    pub whatsapp_numbers: Vec<String>,
    /// Facebook profile links.
    #[serde(default)]
    pub facebook_links: Vec<String>,
    /// Website links.
    #[serde(default)]
    pub website_links: Vec<String>,
    /// Hosted URLs of scanned document pages.
    #[serde(default)]
    pub pdf_urls: Vec<String>,
}

impl PersonDraft {
    /// Check that every mandatory scalar field is non-blank.
    ///
    /// The persistence layer trusts its callers; this runs at the API
    /// boundary before a draft reaches the repository.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` naming every blank mandatory field.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        for (field, value) in [
            ("full_name", &self.full_name),
            ("father_name", &self.father_name),
            ("mother_name", &self.mother_name),
            ("national_id", &self.national_id),
            ("permanent_address", &self.permanent_address),
            ("present_address", &self.present_address),
        ] {
            if value.trim().is_empty() {
                missing.push(field);
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "mandatory fields missing or blank: {}",
                missing.join(", ")
            )))
        }
    }

    /// Iterate every contact handle as a `(kind, value)` pair, in
    /// kind-grouped order.
    pub fn contact_rows(&self) -> impl Iterator<Item = (ContactKind, &str)> {
        let mobiles = self
            .mobile_numbers
            .iter()
            .map(|value| (ContactKind::Mobile, value.as_str()));
        let whatsapps = self
            .whatsapp_numbers
            .iter()
            .map(|value| (ContactKind::Whatsapp, value.as_str()));
        let facebooks = self
            .facebook_links
            .iter()
            .map(|value| (ContactKind::Facebook, value.as_str()));
        let websites = self
            .website_links
            .iter()
            .map(|value| (ContactKind::Website, value.as_str()));
        mobiles.chain(whatsapps).chain(facebooks).chain(websites)
    }
}

/// A persisted person: the draft fields plus server-assigned identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PersonRecord {
    /// Generated identifier, immutable after creation.
    pub id: i64,
    /// Server-assigned creation timestamp, immutable.
    pub created_at: DateTime<Utc>,
    /// The caller-controlled fields.
    #[serde(flatten)]
    pub person: PersonDraft,
}
