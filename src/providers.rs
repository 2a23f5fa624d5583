use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::geo::haversine_km;
use crate::overpass::Element;

/// Amenity/healthcare tag values mapped to the category label shown to users.
const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("hospital", "Hospital"),
    ("clinic", "Clinic"),
    ("doctors", "Doctor"),
    ("pharmacy", "Pharmacy"),
    ("dentist", "Dentist"),
    ("laboratory", "Laboratory"),
];

/// A ranked healthcare facility, assembled per request from a raw Overpass
/// element and discarded once the response is serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub specialty: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub opening_hours: Option<String>,
    pub distance: f64,
    pub lat: f64,
    pub lon: f64,
    pub relevance: i64,
    pub operator: Option<String>,
    pub emergency: bool,
}

#[derive(Debug)]
pub struct RankedProviders {
    pub providers: Vec<ProviderRecord>,
    /// Pre-truncation count of named, locatable elements.
    pub total: usize,
}

/// Map a facility's amenity/healthcare tags to a category label.
pub fn categorize(tags: &HashMap<String, String>) -> &'static str {
    let amenity = tags.get("amenity").map(String::as_str).unwrap_or("");
    let healthcare = tags.get("healthcare").map(String::as_str).unwrap_or("");

    for (value, label) in CATEGORY_LABELS {
        if amenity == *value || healthcare == *value {
            return label;
        }
    }
    if healthcare == "optometrist" {
        return "Eye Care";
    }
    if healthcare == "psychotherapist" || healthcare == "counselling" {
        return "Mental Health";
    }
    "Healthcare"
}

/// Additive relevance heuristic against the free-text query. Effective
/// maximum is 135; no cap is enforced.
pub fn relevance_score(tags: &HashMap<String, String>, query: &str) -> i64 {
    let q = query.to_lowercase();
    let mut score = 0;

    let name = tags.get("name").map(|s| s.to_lowercase()).unwrap_or_default();
    if !name.is_empty() && q.split_whitespace().any(|w| name.contains(w)) {
        score += 50;
    }

    let specialty = specialty_tag(tags).map(str::to_lowercase).unwrap_or_default();
    if !specialty.is_empty() && q.split_whitespace().any(|w| specialty.contains(w)) {
        score += 40;
    }

    if q.contains(&categorize(tags).to_lowercase()) {
        score += 30;
    }

    if tags.contains_key("website")
        || tags.contains_key("phone")
        || tags.contains_key("contact:phone")
    {
        score += 10;
    }

    if tags.contains_key("opening_hours") {
        score += 5;
    }

    score
}

fn specialty_tag(tags: &HashMap<String, String>) -> Option<&str> {
    ["healthcare:speciality", "speciality", "specialty"]
        .iter()
        .find_map(|k| tags.get(*k).map(String::as_str))
}

fn address(tags: &HashMap<String, String>) -> Option<String> {
    let parts: Vec<&str> = ["addr:street", "addr:housenumber", "addr:city", "addr:postcode"]
        .iter()
        .filter_map(|k| tags.get(*k).map(String::as_str))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn resolve_point(el: &Element) -> Option<(f64, f64)> {
    match (el.lat, el.lon) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => el.center.map(|c| (c.lat, c.lon)),
    }
}

/// Score, sort, and paginate raw Overpass elements around an origin point.
///
/// Elements without a name tag are dropped. Elements with neither direct nor
/// center coordinates are excluded rather than scored against (0,0); they
/// would otherwise distort distances for origins far from the null island.
pub fn rank(
    elements: &[Element],
    query: &str,
    origin_lat: f64,
    origin_lon: f64,
    limit: usize,
) -> RankedProviders {
    let mut unlocated = 0usize;
    let mut providers: Vec<ProviderRecord> = Vec::new();

    for el in elements {
        let Some(name) = el.tags.get("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let Some((lat, lon)) = resolve_point(el) else {
            unlocated += 1;
            continue;
        };

        let distance = haversine_km(origin_lat, origin_lon, lat, lon);
        providers.push(ProviderRecord {
            id: el.id,
            name: name.clone(),
            category: categorize(&el.tags).to_string(),
            specialty: specialty_tag(&el.tags).map(str::to_string),
            address: address(&el.tags),
            phone: el
                .tags
                .get("phone")
                .or_else(|| el.tags.get("contact:phone"))
                .cloned(),
            website: el
                .tags
                .get("website")
                .or_else(|| el.tags.get("contact:website"))
                .cloned(),
            opening_hours: el.tags.get("opening_hours").cloned(),
            distance: (distance * 10.0).round() / 10.0,
            lat,
            lon,
            relevance: relevance_score(&el.tags, query),
            operator: el.tags.get("operator").cloned(),
            emergency: el.tags.get("emergency").map(String::as_str) == Some("yes"),
        });
    }

    if unlocated > 0 {
        tracing::debug!("skipped {} named elements without coordinates", unlocated);
    }

    providers.sort_by(|a, b| {
        b.relevance
            .cmp(&a.relevance)
            .then(a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal))
    });

    let total = providers.len();
    providers.truncate(limit);
    RankedProviders { providers, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn node(id: i64, lat: f64, lon: f64, t: &[(&str, &str)]) -> Element {
        Element {
            id,
            lat: Some(lat),
            lon: Some(lon),
            center: None,
            tags: tags(t),
        }
    }

    #[test]
    fn categorize_covers_label_table_and_specials() {
        assert_eq!(categorize(&tags(&[("amenity", "hospital")])), "Hospital");
        assert_eq!(categorize(&tags(&[("healthcare", "clinic")])), "Clinic");
        assert_eq!(categorize(&tags(&[("amenity", "doctors")])), "Doctor");
        assert_eq!(categorize(&tags(&[("amenity", "pharmacy")])), "Pharmacy");
        assert_eq!(categorize(&tags(&[("healthcare", "dentist")])), "Dentist");
        assert_eq!(categorize(&tags(&[("healthcare", "laboratory")])), "Laboratory");
        assert_eq!(categorize(&tags(&[("healthcare", "optometrist")])), "Eye Care");
        assert_eq!(
            categorize(&tags(&[("healthcare", "psychotherapist")])),
            "Mental Health"
        );
        assert_eq!(categorize(&tags(&[("healthcare", "counselling")])), "Mental Health");
        assert_eq!(categorize(&tags(&[("tourism", "hotel")])), "Healthcare");
    }

    #[test]
    fn relevance_is_additive() {
        let t = tags(&[
            ("name", "Smile Dental Studio"),
            ("healthcare:speciality", "dental surgery"),
            ("amenity", "dentist"),
            ("phone", "+91 11 1234"),
            ("opening_hours", "Mo-Sa 09:00-18:00"),
        ]);
        // name +50, specialty +40, category "dentist" in query +30,
        // contact +10, hours +5.
        assert_eq!(relevance_score(&t, "dental dentist"), 135);
    }

    #[test]
    fn relevance_zero_for_unrelated_bare_facility() {
        let t = tags(&[("name", "City Hospital"), ("amenity", "hospital")]);
        assert_eq!(relevance_score(&t, "dentist"), 0);
    }

    #[test]
    fn relevance_counts_contact_and_hours_without_query_match() {
        let t = tags(&[
            ("name", "City Hospital"),
            ("amenity", "hospital"),
            ("website", "https://example.org"),
            ("opening_hours", "24/7"),
        ]);
        assert_eq!(relevance_score(&t, "dentist"), 15);
    }

    #[test]
    fn unnamed_elements_are_dropped() {
        let elements = vec![
            node(1, 28.61, 77.21, &[("amenity", "hospital")]),
            node(2, 28.62, 77.22, &[("amenity", "clinic"), ("name", "Care Clinic")]),
        ];
        let r = rank(&elements, "", 28.6, 77.2, 20);
        assert_eq!(r.total, 1);
        assert!(r.providers.iter().all(|p| !p.name.is_empty()));
    }

    #[test]
    fn elements_without_coordinates_are_excluded() {
        let mut bare = node(3, 0.0, 0.0, &[("amenity", "clinic"), ("name", "Ghost Clinic")]);
        bare.lat = None;
        bare.lon = None;
        let elements = vec![
            bare,
            node(4, 28.62, 77.22, &[("amenity", "clinic"), ("name", "Care Clinic")]),
        ];
        let r = rank(&elements, "", 28.6, 77.2, 20);
        assert_eq!(r.total, 1);
        assert_eq!(r.providers[0].name, "Care Clinic");
    }

    #[test]
    fn way_elements_use_center_coordinates() {
        let el = Element {
            id: 5,
            lat: None,
            lon: None,
            center: Some(crate::overpass::Center { lat: 28.65, lon: 77.25 }),
            tags: tags(&[("amenity", "hospital"), ("name", "Big Hospital")]),
        };
        let r = rank(&[el], "", 28.6, 77.2, 20);
        assert_eq!(r.providers[0].lat, 28.65);
        assert!(r.providers[0].distance > 0.0);
    }

    #[test]
    fn sorted_by_relevance_then_distance() {
        let elements = vec![
            // Far but highly relevant.
            node(1, 28.70, 77.30, &[("amenity", "dentist"), ("name", "Dentist Point")]),
            // Near but irrelevant.
            node(2, 28.601, 77.201, &[("amenity", "pharmacy"), ("name", "Corner Chemist")]),
            // Same relevance as #2 but farther away.
            node(3, 28.65, 77.25, &[("amenity", "pharmacy"), ("name", "Other Chemist")]),
        ];
        let r = rank(&elements, "dentist", 28.6, 77.2, 20);
        let names: Vec<&str> = r.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Dentist Point", "Corner Chemist", "Other Chemist"]);

        for pair in r.providers.windows(2) {
            assert!(pair[0].relevance >= pair[1].relevance);
            if pair[0].relevance == pair[1].relevance {
                assert!(pair[0].distance <= pair[1].distance);
            }
        }
    }

    #[test]
    fn truncates_to_limit_but_reports_full_total() {
        let elements: Vec<Element> = (0..50)
            .map(|i| {
                node(
                    i,
                    28.6 + i as f64 * 0.001,
                    77.2,
                    &[("amenity", "clinic"), ("name", "Clinic")],
                )
            })
            .collect();
        let r = rank(&elements, "", 28.6, 77.2, 20);
        assert_eq!(r.providers.len(), 20);
        assert_eq!(r.total, 50);
    }

    #[test]
    fn address_assembled_from_fragments_in_order() {
        let el = node(
            6,
            28.61,
            77.21,
            &[
                ("name", "Care Clinic"),
                ("amenity", "clinic"),
                ("addr:street", "MG Road"),
                ("addr:city", "Bengaluru"),
                ("addr:postcode", "560001"),
            ],
        );
        let r = rank(&[el], "", 28.6, 77.2, 20);
        assert_eq!(
            r.providers[0].address.as_deref(),
            Some("MG Road, Bengaluru, 560001")
        );
    }

    #[test]
    fn record_serializes_expected_field_names() {
        let el = node(
            7,
            28.61,
            77.21,
            &[
                ("name", "Care Clinic"),
                ("amenity", "clinic"),
                ("opening_hours", "24/7"),
                ("emergency", "yes"),
            ],
        );
        let r = rank(&[el], "clinic", 28.6, 77.2, 20);
        let v = serde_json::to_value(&r.providers[0]).unwrap();
        assert_eq!(v["type"], "Clinic");
        assert_eq!(v["openingHours"], "24/7");
        assert_eq!(v["emergency"], true);
        assert!(v.get("relevance").is_some());
        assert!(v.get("distance").is_some());
    }
}
