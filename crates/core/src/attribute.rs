use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four attribute dimensions a user can override with a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Finish,
    Width,
    Pcd,
    Holes,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [Self::Finish, Self::Width, Self::Pcd, Self::Holes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finish => "finish",
            Self::Width => "width",
            Self::Pcd => "pcd",
            Self::Holes => "holes",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "finish" => Ok(Self::Finish),
            "width" => Ok(Self::Width),
            "pcd" => Ok(Self::Pcd),
            "holes" => Ok(Self::Holes),
            other => Err(format!(
                "unknown dimension: \"{other}\" (expected finish, width, pcd or holes)"
            )),
        }
    }
}

/// Every attribute a spreadsheet row can fail to resolve on.
///
/// Declaration order is the filing priority: a row that fails on several
/// attributes is filed under the first one listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Model,
    Inch,
    Finish,
    Width,
    Pcd,
    Holes,
}

impl Attribute {
    /// The mapping dimension for this attribute, if it can be overridden.
    pub fn dimension(&self) -> Option<Dimension> {
        match self {
            Self::Model | Self::Inch => None,
            Self::Finish => Some(Dimension::Finish),
            Self::Width => Some(Dimension::Width),
            Self::Pcd => Some(Dimension::Pcd),
            Self::Holes => Some(Dimension::Holes),
        }
    }
}

impl From<Dimension> for Attribute {
    fn from(d: Dimension) -> Self {
        match d {
            Dimension::Finish => Self::Finish,
            Dimension::Width => Self::Width,
            Dimension::Pcd => Self::Pcd,
            Dimension::Holes => Self::Holes,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Inch => write!(f, "inch"),
            Self::Finish => write!(f, "finish"),
            Self::Width => write!(f, "width"),
            Self::Pcd => write!(f, "pcd"),
            Self::Holes => write!(f, "holes"),
        }
    }
}
