//! Tour schema: fields, constraints, derived values and validation.
//!
//! Every persist path goes through [`validate_tour`], which trims text
//! fields, checks constraints, applies defaults and derives the slug. The
//! store never sees a [`TourDraft`] directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{CoreError, FieldViolation};
use crate::types::Timestamp;

/// Entity name used in not-found errors.
pub const ENTITY: &str = "Tour";

// ---------------------------------------------------------------------------
// Constraints and defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_RATINGS_AVERAGE: f64 = 4.5;
pub const DEFAULT_RATINGS_QUANTITY: i32 = 0;

pub const DAYS_PER_WEEK: f64 = 7.0;

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Difficult];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation("Tour can either be easy, medium or difficult".into())
            })
    }
}

// ---------------------------------------------------------------------------
// Field registry
// ---------------------------------------------------------------------------

/// How a field's values are parsed and compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    Text,
    Integer,
    Float,
    Difficulty,
    Boolean,
    Timestamp,
    TextList,
    TimestampList,
}

impl FieldKind {
    pub fn is_list(self) -> bool {
        matches!(self, FieldKind::TextList | FieldKind::TimestampList)
    }
}

/// Every addressable field of a tour record.
///
/// Clients name fields by their JSON name ([`TourField::api_name`]); the
/// store uses [`TourField::column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TourField {
    Id,
    Name,
    Slug,
    Duration,
    MaxGroupSize,
    Difficulty,
    RatingsAverage,
    RatingsQuantity,
    Price,
    PriceDiscount,
    Summary,
    Description,
    ImageCover,
    Images,
    CreatedAt,
    StartDates,
    SecretTour,
    Version,
}

impl TourField {
    /// All fields in document order.
    pub const ALL: [TourField; 18] = [
        TourField::Id,
        TourField::Name,
        TourField::Slug,
        TourField::Duration,
        TourField::MaxGroupSize,
        TourField::Difficulty,
        TourField::RatingsAverage,
        TourField::RatingsQuantity,
        TourField::Price,
        TourField::PriceDiscount,
        TourField::Summary,
        TourField::Description,
        TourField::ImageCover,
        TourField::Images,
        TourField::CreatedAt,
        TourField::StartDates,
        TourField::SecretTour,
        TourField::Version,
    ];

    pub fn api_name(self) -> &'static str {
        match self {
            TourField::Id => "id",
            TourField::Name => "name",
            TourField::Slug => "slug",
            TourField::Duration => "duration",
            TourField::MaxGroupSize => "maxGroupSize",
            TourField::Difficulty => "difficulty",
            TourField::RatingsAverage => "ratingsAverage",
            TourField::RatingsQuantity => "ratingsQuantity",
            TourField::Price => "price",
            TourField::PriceDiscount => "priceDiscount",
            TourField::Summary => "summary",
            TourField::Description => "description",
            TourField::ImageCover => "imageCover",
            TourField::Images => "images",
            TourField::CreatedAt => "createdAt",
            TourField::StartDates => "startDates",
            TourField::SecretTour => "secretTour",
            TourField::Version => "version",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            TourField::Id => "id",
            TourField::Name => "name",
            TourField::Slug => "slug",
            TourField::Duration => "duration",
            TourField::MaxGroupSize => "max_group_size",
            TourField::Difficulty => "difficulty",
            TourField::RatingsAverage => "ratings_average",
            TourField::RatingsQuantity => "ratings_quantity",
            TourField::Price => "price",
            TourField::PriceDiscount => "price_discount",
            TourField::Summary => "summary",
            TourField::Description => "description",
            TourField::ImageCover => "image_cover",
            TourField::Images => "images",
            TourField::CreatedAt => "created_at",
            TourField::StartDates => "start_dates",
            TourField::SecretTour => "secret_tour",
            TourField::Version => "version",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            TourField::Id => FieldKind::Id,
            TourField::Name
            | TourField::Slug
            | TourField::Summary
            | TourField::Description
            | TourField::ImageCover => FieldKind::Text,
            TourField::Duration
            | TourField::MaxGroupSize
            | TourField::RatingsQuantity
            | TourField::Version => FieldKind::Integer,
            TourField::RatingsAverage | TourField::Price | TourField::PriceDiscount => {
                FieldKind::Float
            }
            TourField::Difficulty => FieldKind::Difficulty,
            TourField::SecretTour => FieldKind::Boolean,
            TourField::CreatedAt => FieldKind::Timestamp,
            TourField::Images => FieldKind::TextList,
            TourField::StartDates => FieldKind::TimestampList,
        }
    }

    /// Look up a field by its JSON name.
    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.api_name() == name)
    }

    /// Look up a field by its column (or Rust struct field) name.
    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == column)
    }

    /// List-valued fields have no total order and cannot be sort keys.
    pub fn is_sortable(self) -> bool {
        !self.kind().is_list()
    }
}

impl fmt::Display for TourField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

/// Generate a URL-safe slug from a tour name.
///
/// Non-ASCII letters are transliterated (`"Café"` becomes `"cafe"`), then
/// everything that is not alphanumeric collapses into single hyphens.
pub fn slugify(name: &str) -> String {
    slug::slugify(name.trim())
}

/// Tour length in weeks. Never persisted; computed whenever a tour is read.
pub fn duration_weeks(duration_days: i32) -> f64 {
    f64::from(duration_days) / DAYS_PER_WEEK
}

// ---------------------------------------------------------------------------
// Draft and validation
// ---------------------------------------------------------------------------

/// Client-supplied tour document, used both for creation and (merged onto
/// the stored document) for updates.
///
/// Required fields are optional here so that a missing field is reported as
/// a field violation rather than a deserialization failure. `slug`,
/// `createdAt` and `version` are not accepted; unknown keys are ignored.
///
/// The nullable fields are `Option<Option<_>>`: `None` when the key is
/// absent, `Some(None)` when it is an explicit `null`, which clears the
/// stored value on update.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TourDraft {
    #[validate(
        required(message = "A tour must have a name"),
        length(
            min = 10,
            max = 40,
            message = "A tour name must have between 10 and 40 characters"
        )
    )]
    pub name: Option<String>,

    #[validate(required(message = "A tour must have a duration"))]
    pub duration: Option<i32>,

    #[validate(required(message = "A tour must have a group size"))]
    pub max_group_size: Option<i32>,

    #[validate(
        required(message = "A tour must have a difficulty"),
        custom(function = "validate_difficulty")
    )]
    pub difficulty: Option<String>,

    #[validate(range(
        min = 1.0,
        max = 5.0,
        message = "Rating must be between 1.0 and 5.0"
    ))]
    pub ratings_average: Option<f64>,

    pub ratings_quantity: Option<i32>,

    #[validate(required(message = "A tour must have a price"))]
    pub price: Option<f64>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub price_discount: Option<Option<f64>>,

    #[validate(
        required(message = "A tour must have a summary"),
        length(min = 1, message = "A tour must have a summary")
    )]
    pub summary: Option<String>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub description: Option<Option<String>>,

    #[validate(
        required(message = "A tour must have a cover image"),
        length(min = 1, message = "A tour must have a cover image")
    )]
    pub image_cover: Option<String>,

    pub images: Option<Vec<String>>,

    pub start_dates: Option<Vec<Timestamp>>,

    pub secret_tour: Option<bool>,
}

impl TourDraft {
    /// Overlay `patch` onto `self`: every field present in the patch wins,
    /// including an explicit `null` on a nullable field.
    pub fn merged_with(self, patch: TourDraft) -> TourDraft {
        TourDraft {
            name: patch.name.or(self.name),
            duration: patch.duration.or(self.duration),
            max_group_size: patch.max_group_size.or(self.max_group_size),
            difficulty: patch.difficulty.or(self.difficulty),
            ratings_average: patch.ratings_average.or(self.ratings_average),
            ratings_quantity: patch.ratings_quantity.or(self.ratings_quantity),
            price: patch.price.or(self.price),
            price_discount: patch.price_discount.or(self.price_discount),
            summary: patch.summary.or(self.summary),
            description: patch.description.or(self.description),
            image_cover: patch.image_cover.or(self.image_cover),
            images: patch.images.or(self.images),
            start_dates: patch.start_dates.or(self.start_dates),
            secret_tour: patch.secret_tour.or(self.secret_tour),
        }
    }

    fn trimmed(mut self) -> Self {
        let trim = |s: String| s.trim().to_string();
        self.name = self.name.map(trim);
        self.summary = self.summary.map(trim);
        self.description = self.description.map(|d| d.map(trim));
        self
    }
}

/// Keep a present `null` distinct from an absent key.
fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_difficulty(value: &str) -> Result<(), ValidationError> {
    if value.parse::<Difficulty>().is_ok() {
        return Ok(());
    }
    let mut err = ValidationError::new("difficulty");
    err.message = Some("Tour can either be easy, medium or difficult".into());
    Err(err)
}

/// A tour that passed validation, with defaults applied and slug derived.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidTour {
    pub name: String,
    pub slug: String,
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub price: f64,
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub start_dates: Vec<Timestamp>,
    pub secret_tour: bool,
}

/// Validate a draft and prepare it for persisting.
///
/// Collects every violation before failing. `priceDiscount` is checked
/// against the `price` of the same draft, so for updates callers must pass
/// the merged document.
pub fn validate_tour(draft: TourDraft) -> Result<ValidTour, CoreError> {
    let draft = draft.trimmed();

    let mut violations = match draft.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => collect_violations(&errors),
    };

    if let (Some(discount), Some(price)) = (draft.price_discount.flatten(), draft.price) {
        if discount >= price {
            violations.push(FieldViolation::new(
                TourField::PriceDiscount.api_name(),
                format!("Discount price ({discount}) should be less than regular price"),
            ));
        }
    }

    if !violations.is_empty() {
        violations.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));
        return Err(CoreError::InvalidFields(violations));
    }

    let missing = |field: TourField| {
        CoreError::Internal(format!("validated tour is missing required field {field}"))
    };

    let name = draft.name.ok_or_else(|| missing(TourField::Name))?;
    let difficulty: Difficulty = draft
        .difficulty
        .ok_or_else(|| missing(TourField::Difficulty))?
        .parse()?;

    Ok(ValidTour {
        slug: slugify(&name),
        name,
        duration: draft.duration.ok_or_else(|| missing(TourField::Duration))?,
        max_group_size: draft
            .max_group_size
            .ok_or_else(|| missing(TourField::MaxGroupSize))?,
        difficulty,
        ratings_average: draft.ratings_average.unwrap_or(DEFAULT_RATINGS_AVERAGE),
        ratings_quantity: draft.ratings_quantity.unwrap_or(DEFAULT_RATINGS_QUANTITY),
        price: draft.price.ok_or_else(|| missing(TourField::Price))?,
        price_discount: draft.price_discount.flatten(),
        summary: draft.summary.ok_or_else(|| missing(TourField::Summary))?,
        description: draft.description.flatten(),
        image_cover: draft
            .image_cover
            .ok_or_else(|| missing(TourField::ImageCover))?,
        images: draft.images.unwrap_or_default(),
        start_dates: draft.start_dates.unwrap_or_default(),
        secret_tour: draft.secret_tour.unwrap_or(false),
    })
}

/// Flatten `validator` errors into violations keyed by JSON field name.
fn collect_violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        let field: &str = &field;
        let name = TourField::from_column(field)
            .map(TourField::api_name)
            .unwrap_or(field);
        for err in field_errors.iter() {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {name}"));
            violations.push(FieldViolation::new(name, message));
        }
    }
    violations
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn valid_draft() -> TourDraft {
        TourDraft {
            name: Some("The Forest Hiker".into()),
            duration: Some(5),
            max_group_size: Some(25),
            difficulty: Some("easy".into()),
            price: Some(397.0),
            summary: Some("Breathtaking hike through the Canadian Banff National Park".into()),
            image_cover: Some("tour-1-cover.jpg".into()),
            ..TourDraft::default()
        }
    }

    fn violation_fields(err: CoreError) -> Vec<String> {
        match err {
            CoreError::InvalidFields(v) => v.into_iter().map(|v| v.field).collect(),
            other => panic!("expected InvalidFields, got {other:?}"),
        }
    }

    // -- slugify --

    #[test]
    fn slug_lowercases_and_hyphenates() {
        assert_eq!(slugify("The Forest Hiker"), "the-forest-hiker");
    }

    #[test]
    fn slug_collapses_punctuation_runs() {
        assert_eq!(slugify("  Sea & Sun -- Explorer!  "), "sea-sun-explorer");
    }

    #[test]
    fn slug_transliterates_non_ascii_letters() {
        assert_eq!(slugify("Café Zürich Explorer"), "cafe-zurich-explorer");
        assert_eq!(slugify("São Paulo Nights"), "sao-paulo-nights");
    }

    #[test]
    fn slug_is_deterministic() {
        let name = "The Northern Lights";
        assert_eq!(slugify(name), slugify(name));
        assert_eq!(slugify(&slugify(name)), slugify(name));
    }

    // -- duration_weeks --

    #[test]
    fn duration_weeks_divides_by_seven() {
        assert_eq!(duration_weeks(14), 2.0);
        assert!((duration_weeks(5) - 5.0 / 7.0).abs() < f64::EPSILON);
    }

    // -- difficulty --

    #[test]
    fn difficulty_round_trips_through_str() {
        for d in Difficulty::ALL {
            assert_eq!(d.as_str().parse::<Difficulty>().unwrap(), d);
        }
        assert_matches!("extreme".parse::<Difficulty>(), Err(CoreError::Validation(_)));
    }

    // -- field registry --

    #[test]
    fn field_lookup_by_api_name_and_column() {
        assert_eq!(TourField::from_api_name("maxGroupSize"), Some(TourField::MaxGroupSize));
        assert_eq!(TourField::from_column("max_group_size"), Some(TourField::MaxGroupSize));
        assert_eq!(TourField::from_api_name("max_group_size"), None);
        assert!(!TourField::StartDates.is_sortable());
        assert!(TourField::Price.is_sortable());
    }

    // -- validate_tour --

    #[test]
    fn valid_draft_gets_defaults_and_slug() {
        let tour = validate_tour(valid_draft()).unwrap();
        assert_eq!(tour.slug, "the-forest-hiker");
        assert_eq!(tour.ratings_average, DEFAULT_RATINGS_AVERAGE);
        assert_eq!(tour.ratings_quantity, 0);
        assert!(!tour.secret_tour);
        assert!(tour.images.is_empty());
        assert_eq!(tour.difficulty, Difficulty::Easy);
    }

    #[test]
    fn name_and_summary_are_trimmed() {
        let draft = TourDraft {
            name: Some("   The Sea Explorer   ".into()),
            summary: Some("  Exploring the coast  ".into()),
            ..valid_draft()
        };
        let tour = validate_tour(draft).unwrap();
        assert_eq!(tour.name, "The Sea Explorer");
        assert_eq!(tour.summary, "Exploring the coast");
        assert_eq!(tour.slug, "the-sea-explorer");
    }

    #[test]
    fn short_name_is_rejected() {
        let draft = TourDraft {
            name: Some("Short".into()),
            ..valid_draft()
        };
        assert_eq!(violation_fields(validate_tour(draft).unwrap_err()), vec!["name"]);
    }

    #[test]
    fn name_length_counted_after_trimming() {
        let draft = TourDraft {
            name: Some("   Nine Char   ".into()),
            ..valid_draft()
        };
        assert_eq!(violation_fields(validate_tour(draft).unwrap_err()), vec!["name"]);
    }

    #[test]
    fn long_name_is_rejected() {
        let draft = TourDraft {
            name: Some("A".repeat(41)),
            ..valid_draft()
        };
        assert_eq!(violation_fields(validate_tour(draft).unwrap_err()), vec!["name"]);
    }

    #[test]
    fn discount_must_be_below_price() {
        let draft = TourDraft {
            price_discount: Some(Some(397.0)),
            ..valid_draft()
        };
        assert_eq!(
            violation_fields(validate_tour(draft).unwrap_err()),
            vec!["priceDiscount"]
        );

        let draft = TourDraft {
            price_discount: Some(Some(100.0)),
            ..valid_draft()
        };
        assert_eq!(validate_tour(draft).unwrap().price_discount, Some(100.0));
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let draft = TourDraft {
            ratings_average: Some(5.5),
            ..valid_draft()
        };
        assert_eq!(
            violation_fields(validate_tour(draft).unwrap_err()),
            vec!["ratingsAverage"]
        );
    }

    #[test]
    fn unknown_difficulty_is_rejected() {
        let draft = TourDraft {
            difficulty: Some("extreme".into()),
            ..valid_draft()
        };
        assert_eq!(
            violation_fields(validate_tour(draft).unwrap_err()),
            vec!["difficulty"]
        );
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let fields = violation_fields(validate_tour(TourDraft::default()).unwrap_err());
        for expected in [
            "difficulty",
            "duration",
            "imageCover",
            "maxGroupSize",
            "name",
            "price",
            "summary",
        ] {
            assert!(fields.iter().any(|f| f == expected), "missing {expected}");
        }
    }

    #[test]
    fn merged_patch_overrides_only_present_fields() {
        let patch = TourDraft {
            price: Some(200.0),
            ..TourDraft::default()
        };
        let merged = valid_draft().merged_with(patch);
        assert_eq!(merged.price, Some(200.0));
        assert_eq!(merged.name.as_deref(), Some("The Forest Hiker"));
    }

    #[test]
    fn merged_discount_checked_against_merged_price() {
        let stored = TourDraft {
            price_discount: Some(Some(150.0)),
            ..valid_draft()
        };
        let patch = TourDraft {
            price: Some(120.0),
            ..TourDraft::default()
        };
        let err = validate_tour(stored.merged_with(patch)).unwrap_err();
        assert_eq!(violation_fields(err), vec!["priceDiscount"]);
    }

    #[test]
    fn explicit_null_clears_a_stored_discount() {
        let stored = TourDraft {
            price_discount: Some(Some(100.0)),
            description: Some(Some("Long walks".into())),
            ..valid_draft()
        };
        let patch: TourDraft =
            serde_json::from_str(r#"{"priceDiscount": null, "description": null, "price": 50}"#)
                .unwrap();
        assert_eq!(patch.price_discount, Some(None));
        assert_eq!(patch.description, Some(None));

        let tour = validate_tour(stored.merged_with(patch)).unwrap();
        assert_eq!(tour.price, 50.0);
        assert_eq!(tour.price_discount, None);
        assert_eq!(tour.description, None);
    }

    #[test]
    fn absent_nullable_keys_keep_stored_values() {
        let stored = TourDraft {
            price_discount: Some(Some(100.0)),
            ..valid_draft()
        };
        let patch: TourDraft = serde_json::from_str(r#"{"price": 300}"#).unwrap();
        assert_eq!(patch.price_discount, None);

        let tour = validate_tour(stored.merged_with(patch)).unwrap();
        assert_eq!(tour.price_discount, Some(100.0));
    }
}
