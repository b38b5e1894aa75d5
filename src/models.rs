// Records passed between the three pipelines. They're persisted positionally as spreadsheet rows,
// so there's no identity beyond the row index.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Placeholder written for phone numbers and websites the places API didn't have
pub static NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Business {
    /// Business name as listed
    pub name: String,
    /// Formatted street address
    pub address: Option<String>,
    /// The search keyword that found this business, e.g. "HVAC contractor"
    pub category: Option<String>,
    pub phone: Option<String>,
    /// Homepage, as given by the listing. Not necessarily with a scheme.
    pub website: Option<String>,
    /// Set after the owner lookup pass
    pub owners: Option<Owners>,
}

impl Business {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_owners(self, owners: Owners) -> Self {
        Self {
            owners: Some(owners),
            ..self
        }
    }
}

/// Owner lookup results, one per source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Owners {
    pub website: Lookup,
    pub google: Lookup,
    pub bbb: Lookup,
}

/// Outcome of a single owner lookup. Everything but `Found` is stored as a fixed sentinel string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NoWebsite,
    #[default]
    NotFound,
    NoOwnerInfo,
    ApiKeyError,
    ApiError,
    Error,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    fn sentinel(&self) -> Option<&'static str> {
        match self {
            Self::Found(_) => None,
            Self::NoWebsite => Some("No Website"),
            Self::NotFound => Some("Not Found"),
            Self::NoOwnerInfo => Some("No Owner Info Found"),
            Self::ApiKeyError => Some("API Key Error"),
            Self::ApiError => Some("API Error"),
            Self::Error => Some("Error"),
        }
    }
}

impl Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Found(v) => write!(f, "{v}"),
            other => write!(f, "{}", other.sentinel().unwrap_or_default()),
        }
    }
}

impl From<&str> for Lookup {
    fn from(value: &str) -> Self {
        match value.trim() {
            "" | "Not Found" => Self::NotFound,
            "No Website" => Self::NoWebsite,
            "No Owner Info Found" => Self::NoOwnerInfo,
            "API Key Error" => Self::ApiKeyError,
            "API Error" => Self::ApiError,
            "Error" => Self::Error,
            v => Self::Found(v.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_display() {
        assert_eq!("Jane Doe", Lookup::Found("Jane Doe".into()).to_string());
        assert_eq!("No Owner Info Found", Lookup::NoOwnerInfo.to_string());
        assert_eq!("API Key Error", Lookup::ApiKeyError.to_string());
    }

    #[test]
    fn lookup_from_cell() {
        assert_eq!(Lookup::NotFound, Lookup::from(""));
        assert_eq!(Lookup::NoWebsite, Lookup::from("No Website"));
        assert_eq!(Lookup::ApiError, Lookup::from(" API Error "));
        assert_eq!(
            Lookup::Found("https://acme.test/about".into()),
            Lookup::from("https://acme.test/about")
        );
    }

    #[test]
    fn lat_lng_display() {
        assert_eq!("34.0007,-81.0348", LatLng::new(34.0007, -81.0348).to_string());
    }
}
