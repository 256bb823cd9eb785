//! Data model definitions for the persisted quota and history records.
//!
//! Field names serialize in camelCase so that the stored JSON matches what
//! browser front-ends already keep under the same storage keys:
//!
//! ```json
//! {"count": 3, "date": "2024-01-15"}
//! [{"id": 1705312200000, "prompt": "cat", "numberOfImages": 2,
//!   "aspectRatio": "1:1", "thumbnailSrc": "data:image/jpeg;base64,..."}]
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Image counts a user may request in a single generation.
pub const IMAGE_COUNT_OPTIONS: [u32; 4] = [1, 2, 3, 4];

/// Output aspect ratios supported by the image provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "3:4")]
    Portrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Widescreen,
        AspectRatio::Tall,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Tall => "9:16",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Portrait => "3:4",
        }
    }
}

impl Display for AspectRatio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .iter()
            .copied()
            .find(|ratio| ratio.as_str() == s)
            .ok_or_else(|| format!("Unsupported aspect ratio: {s}"))
    }
}

/// Number of images generated on a given local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub count: u32,
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
}

impl QuotaRecord {
    /// A zeroed record for `today`.
    pub fn fresh(today: NaiveDate) -> Self {
        Self { count: 0, date: today }
    }

    pub fn is_for(&self, day: NaiveDate) -> bool {
        self.date == day
    }
}

/// One past generation request, with a reference to its first image.
///
/// `id` is the creation time in epoch milliseconds and doubles as the
/// removal key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: i64,
    pub prompt: String,
    pub number_of_images: u32,
    pub aspect_ratio: AspectRatio,
    pub thumbnail_src: String,
}

impl HistoryItem {
    /// True when both items describe the same request settings.
    pub fn same_settings(&self, other: &HistoryItem) -> bool {
        self.prompt == other.prompt
            && self.number_of_images == other.number_of_images
            && self.aspect_ratio == other.aspect_ratio
    }

    /// The request that produced this item, for pre-filling the prompt form.
    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt.clone(),
            number_of_images: self.number_of_images,
            aspect_ratio: self.aspect_ratio,
        }
    }
}

/// A single image returned by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Usually a `data:image/jpeg;base64,...` URI.
    pub src: String,
    pub prompt: String,
}

/// Parameters submitted from the prompt form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub number_of_images: u32,
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, number_of_images: u32, aspect_ratio: AspectRatio) -> Self {
        Self {
            prompt: prompt.into(),
            number_of_images,
            aspect_ratio,
        }
    }

    /// Checks the same constraints the prompt form enforces before submitting.
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("Prompt must not be empty".to_string());
        }
        if !IMAGE_COUNT_OPTIONS.contains(&self.number_of_images) {
            return Err(format!(
                "numberOfImages must be one of {:?}, got {}",
                IMAGE_COUNT_OPTIONS, self.number_of_images
            ));
        }
        Ok(())
    }
}
