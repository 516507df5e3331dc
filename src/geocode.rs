use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::{config::Config, model::GeoPoint};

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Failed to build geocoder client: {0}")]
    ClientFailed(String),
    #[error("Reverse geocoding request failed: {0}")]
    RequestFailed(String),
    #[error("Reverse geocoding returned status {0}")]
    BadStatus(u16),
    #[error("Failed to decode geocoder response: {0}")]
    DecodeFailed(String),
}

/// Nominatim-backed reverse geocoder. Used by the HTTP layer to backfill
/// `locationName` before a report reaches the store.
pub struct ReverseGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl ReverseGeocoder {
    pub fn new(config: &Config) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.geocoder_user_agent.clone())
            .timeout(Duration::from_secs(config.geocoder_timeout_secs))
            .build()
            .map_err(|e| GeocodeError::ClientFailed(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.geocoder_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn reverse(&self, point: GeoPoint) -> Result<Option<String>, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", point.lat.to_string()),
                ("lon", point.lng.to_string()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::BadStatus(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GeocodeError::DecodeFailed(e.to_string()))?;
        Ok(location_name_from_response(&body))
    }
}

fn first_str<'a>(addr: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| addr.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Turn a Nominatim `jsonv2` reverse response into "ward, city", falling back
/// to district/state and finally to the leading parts of `display_name`.
pub fn location_name_from_response(body: &Value) -> Option<String> {
    let empty = Value::Null;
    let addr = body.get("address").unwrap_or(&empty);

    let city = first_str(addr, &["city", "town", "village"]);
    let ward = first_str(addr, &["neighbourhood", "suburb", "city_district", "quarter"]);
    match (ward, city) {
        (Some(ward), Some(city)) => return Some(format!("{}, {}", ward, city)),
        (None, Some(city)) => return Some(city.to_string()),
        _ => {}
    }

    if let Some(district) = first_str(addr, &["city_district", "state_district", "county", "state"]) {
        return Some(district.to_string());
    }

    let parts: Vec<&str> = body
        .get("display_name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with(|c: char| c.is_ascii_digit()))
        .take(2)
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ward_and_city() {
        let body = json!({"address": {"suburb": "Adyar", "city": "Chennai", "state": "Tamil Nadu"}});
        assert_eq!(location_name_from_response(&body).as_deref(), Some("Adyar, Chennai"));

        let body = json!({"address": {"neighbourhood": "Fort Kochi", "suburb": "Ignored", "town": "Kochi"}});
        assert_eq!(location_name_from_response(&body).as_deref(), Some("Fort Kochi, Kochi"));
    }

    #[test]
    fn test_city_only() {
        let body = json!({"address": {"village": "Red Hills"}});
        assert_eq!(location_name_from_response(&body).as_deref(), Some("Red Hills"));
    }

    #[test]
    fn test_district_and_state_fallbacks() {
        let body = json!({"address": {"state_district": "Thiruvallur", "state": "Tamil Nadu"}});
        assert_eq!(location_name_from_response(&body).as_deref(), Some("Thiruvallur"));

        let body = json!({"address": {"state": "Kerala"}});
        assert_eq!(location_name_from_response(&body).as_deref(), Some("Kerala"));
    }

    #[test]
    fn test_display_name_fallback() {
        let body = json!({"display_name": "600020, Gandhi Road, Guindy, Chennai, India"});
        assert_eq!(location_name_from_response(&body).as_deref(), Some("Gandhi Road, Guindy"));

        assert_eq!(location_name_from_response(&json!({})), None);
        assert_eq!(location_name_from_response(&json!({"display_name": "12, 34"})), None);
    }
}
