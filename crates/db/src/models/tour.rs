//! Tour row model and its read-side projection.

use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::FromRow;
use tours_core::features::Projection;
use tours_core::tour::{duration_weeks, TourDraft, TourField};
use tours_core::types::{DbId, Timestamp};

use crate::observe::RowCount;

/// A row from the `tours` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: DbId,
    pub name: String,
    pub slug: String,
    pub duration: i32,
    pub max_group_size: i32,
    /// One of `easy`, `medium`, `difficult` (enforced by a CHECK constraint).
    pub difficulty: String,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub price: f64,
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub created_at: Timestamp,
    pub start_dates: Vec<Timestamp>,
    pub secret_tour: bool,
    /// Revision counter, bumped on every update.
    pub version: i32,
}

impl Tour {
    pub fn duration_weeks(&self) -> f64 {
        duration_weeks(self.duration)
    }

    /// The stored document as a draft, ready to have a patch merged onto it.
    pub fn to_draft(&self) -> TourDraft {
        TourDraft {
            name: Some(self.name.clone()),
            duration: Some(self.duration),
            max_group_size: Some(self.max_group_size),
            difficulty: Some(self.difficulty.clone()),
            ratings_average: Some(self.ratings_average),
            ratings_quantity: Some(self.ratings_quantity),
            price: Some(self.price),
            price_discount: Some(self.price_discount),
            summary: Some(self.summary.clone()),
            description: Some(self.description.clone()),
            image_cover: Some(self.image_cover.clone()),
            images: Some(self.images.clone()),
            start_dates: Some(self.start_dates.clone()),
            secret_tour: Some(self.secret_tour),
        }
    }

    /// JSON value of a single field, keyed the way clients name it.
    pub fn field_value(&self, field: TourField) -> Value {
        match field {
            TourField::Id => json!(self.id),
            TourField::Name => json!(self.name),
            TourField::Slug => json!(self.slug),
            TourField::Duration => json!(self.duration),
            TourField::MaxGroupSize => json!(self.max_group_size),
            TourField::Difficulty => json!(self.difficulty),
            TourField::RatingsAverage => json!(self.ratings_average),
            TourField::RatingsQuantity => json!(self.ratings_quantity),
            TourField::Price => json!(self.price),
            TourField::PriceDiscount => json!(self.price_discount),
            TourField::Summary => json!(self.summary),
            TourField::Description => json!(self.description),
            TourField::ImageCover => json!(self.image_cover),
            TourField::Images => json!(self.images),
            TourField::CreatedAt => json!(self.created_at),
            TourField::StartDates => json!(self.start_dates),
            TourField::SecretTour => json!(self.secret_tour),
            TourField::Version => json!(self.version),
        }
    }

    /// Render the fields selected by `projection`, plus the derived
    /// `durationWeeks` whenever `duration` is selected.
    pub fn to_document(&self, projection: &Projection) -> Map<String, Value> {
        let mut doc = Map::new();
        for field in TourField::ALL {
            if projection.includes(field) {
                doc.insert(field.api_name().to_string(), self.field_value(field));
            }
        }
        if projection.includes(TourField::Duration) {
            doc.insert("durationWeeks".to_string(), json!(self.duration_weeks()));
        }
        doc
    }
}

impl RowCount for Tour {
    fn row_count(&self) -> usize {
        1
    }
}
