use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::Deserialize;

const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
const OVERPASS_TIMEOUT: Duration = Duration::from_secs(15);

/// Query keywords mapped to the OSM tag filters they should pull in.
/// Declaration order is the scan order; overlapping keywords may append
/// duplicate filters, which Overpass tolerates.
const KEYWORD_TAGS: &[(&str, &[(&str, &str)])] = &[
    ("doctor", &[("amenity", "doctors"), ("healthcare", "doctor")]),
    ("physician", &[("amenity", "doctors"), ("healthcare", "doctor")]),
    ("lab", &[("healthcare", "laboratory"), ("amenity", "laboratory")]),
    ("test", &[("healthcare", "laboratory")]),
    ("diagnostic", &[("healthcare", "laboratory")]),
    ("pathology", &[("healthcare", "laboratory")]),
    ("pharmacy", &[("amenity", "pharmacy")]),
    ("medicine", &[("amenity", "pharmacy")]),
    ("dentist", &[("amenity", "dentist")]),
    ("dental", &[("amenity", "dentist")]),
    ("eye", &[("healthcare", "optometrist"), ("shop", "optician")]),
    (
        "mental",
        &[("healthcare", "psychotherapist"), ("healthcare", "counselling")],
    ),
    ("psychiatr", &[("healthcare", "psychotherapist")]),
];

/// Tag filters used when the free-text query matched no keyword.
const DEFAULT_TAGS: &[(&str, &str)] = &[
    ("amenity", "doctors"),
    ("amenity", "pharmacy"),
    ("healthcare", "laboratory"),
];

/// One element of an Overpass response. Ways carry their coordinate in
/// `center` rather than directly.
#[derive(Debug, Clone, Deserialize)]
pub struct Element {
    /// Occasionally absent upstream; a zero id must not sink the whole
    /// response.
    #[serde(default)]
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<Center>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

/// Build an Overpass QL query for healthcare facilities around a point.
///
/// Hospitals and clinics are always included; the lowercased free-text query
/// is scanned against `KEYWORD_TAGS` for additional filters, falling back to
/// `DEFAULT_TAGS` when nothing matches. Deterministic for fixed inputs.
pub fn build_query(lat: f64, lon: f64, radius_m: u32, query: &str) -> String {
    let q = query.to_lowercase();
    let around = format!("(around:{radius_m},{lat},{lon});");

    let mut filters = String::new();
    for amenity in ["hospital", "clinic"] {
        filters.push_str(&format!("node[\"amenity\"=\"{amenity}\"]{around}"));
        filters.push_str(&format!("way[\"amenity\"=\"{amenity}\"]{around}"));
    }

    let mut matched = false;
    for (keyword, tags) in KEYWORD_TAGS {
        if !q.contains(keyword) {
            continue;
        }
        matched = true;
        for (key, value) in *tags {
            filters.push_str(&format!("node[\"{key}\"=\"{value}\"]{around}"));
            filters.push_str(&format!("way[\"{key}\"=\"{value}\"]{around}"));
        }
    }

    if !matched {
        for (key, value) in DEFAULT_TAGS {
            filters.push_str(&format!("node[\"{key}\"=\"{value}\"]{around}"));
        }
    }

    format!("[out:json][timeout:15];({filters});out center body;")
}

/// Thin client for the Overpass interpreter endpoint. One form-encoded POST
/// per search, no retries.
#[derive(Clone)]
pub struct OverpassClient {
    http: reqwest::Client,
    endpoint: String,
}

impl OverpassClient {
    pub fn new() -> Self {
        Self::with_endpoint(OVERPASS_URL.to_string())
    }

    pub fn with_endpoint(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    pub async fn search(
        &self,
        lat: f64,
        lon: f64,
        radius_m: u32,
        query: &str,
    ) -> anyhow::Result<Vec<Element>> {
        let overpass_q = build_query(lat, lon, radius_m, query);
        let resp = self
            .http
            .post(&self.endpoint)
            .form(&[("data", overpass_q.as_str())])
            .timeout(OVERPASS_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("POST {}", self.endpoint))?;

        if !resp.status().is_success() {
            return Err(anyhow!("Overpass API returned {}", resp.status()));
        }

        let body: OverpassResponse = resp.json().await.context("decode Overpass response")?;
        Ok(body.elements)
    }
}

impl Default for OverpassClient {
    fn default() -> Self {
        Self::new()
    }
}
