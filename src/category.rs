//! Task categories.
//!
//! The set is closed: every task carries exactly one of these five labels.
//! Stored records use the lowercase id (`"work"`, `"shopping"`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Personal,
    Shopping,
    Health,
    #[default]
    Others,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Personal,
        Category::Shopping,
        Category::Health,
        Category::Others,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Personal => "personal",
            Category::Shopping => "shopping",
            Category::Health => "health",
            Category::Others => "others",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Shopping => "Shopping",
            Category::Health => "Health",
            Category::Others => "Others",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Work => "Professional tasks and projects",
            Category::Personal => "Personal goals and activities",
            Category::Shopping => "Items to buy and errands",
            Category::Health => "Health and wellness tasks",
            Category::Others => "Other tasks",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::UnknownCategory(trimmed.to_string()))
    }
}

/// Lenient decoding for stored records: a missing, null, or unrecognized
/// category loads as [`Category::Others`].
pub(crate) fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Category, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(|value| value.parse().ok())
        .unwrap_or_default())
}
