use serde::Deserialize;
use std::time::Duration;

use crate::{
    config::Settings,
    models::GeoLocation,
    utils::{ApiError, ApiResult},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    #[serde(default)]
    street: String,
    /// city
    #[serde(default)]
    admin_area5: String,
    /// state
    #[serde(default)]
    admin_area3: String,
    /// country code
    #[serde(default)]
    admin_area1: String,
    #[serde(default)]
    postal_code: String,
    lat_lng: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub latitude: f64,
    pub longitude: f64,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl GeocodedPlace {
    pub fn formatted_address(&self) -> String {
        let state_zip = [self.state.as_deref(), self.zipcode.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        [self.street.as_deref(), self.city.as_deref(), Some(state_zip.as_str()), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<GeocodedPlace> for GeoLocation {
    fn from(place: GeocodedPlace) -> Self {
        let formatted = place.formatted_address();
        GeoLocation {
            formatted_address: Some(formatted).filter(|f| !f.is_empty()),
            street: place.street,
            city: place.city,
            state: place.state,
            zipcode: place.zipcode,
            country: place.country,
            ..GeoLocation::point(place.longitude, place.latitude)
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn first_place(response: MapQuestResponse) -> Option<GeocodedPlace> {
    let location = response.results.into_iter().next()?.locations.into_iter().next()?;
    Some(GeocodedPlace {
        latitude: location.lat_lng.lat,
        longitude: location.lat_lng.lng,
        street: non_empty(location.street),
        city: non_empty(location.admin_area5),
        state: non_empty(location.admin_area3),
        zipcode: non_empty(location.postal_code),
        country: non_empty(location.admin_area1),
    })
}

/// MapQuest geocoding client; one instance is shared by all workers.
#[derive(Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Geocoder {
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Geocoder {
            client,
            base_url: settings.geocoder_base_url.clone(),
            api_key: settings.geocoder_api_key.clone(),
        })
    }

    pub async fn geocode(&self, query: &str) -> ApiResult<GeocodedPlace> {
        if self.api_key.is_empty() {
            return Err(ApiError::Internal("GEOCODER_API_KEY is not configured".to_string()));
        }

        let url = format!(
            "{}?key={}&location={}&maxResults=1",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(query)
        );

        log::debug!("🌍 Geocoding '{}'", query);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Internal(format!("Geocoder request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Geocoder returned status {}",
                response.status()
            )));
        }

        let body: MapQuestResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Internal(format!("Geocoder response unreadable: {}", e)))?;

        first_place(body).ok_or_else(|| ApiError::BadRequest(format!("Could not geocode '{}'", query)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;

    const SAMPLE: &str = r#"{
        "results": [{
            "locations": [{
                "street": "233 Bay State Rd",
                "adminArea5": "Boston",
                "adminArea3": "MA",
                "adminArea1": "US",
                "postalCode": "02215",
                "latLng": { "lat": 42.350846, "lng": -71.105723 }
            }]
        }]
    }"#;

    #[test]
    fn first_location_is_extracted() {
        let response: MapQuestResponse = serde_json::from_str(SAMPLE).unwrap();
        let place = first_place(response).unwrap();

        assert_eq!(place.latitude, 42.350846);
        assert_eq!(place.longitude, -71.105723);
        assert_eq!(place.city.as_deref(), Some("Boston"));
        assert_eq!(place.formatted_address(), "233 Bay State Rd, Boston, MA 02215, US");
    }

    #[test]
    fn empty_results_yield_nothing() {
        let response: MapQuestResponse = serde_json::from_str(r#"{"results":[{"locations":[]}]}"#).unwrap();
        assert!(first_place(response).is_none());
    }

    #[test]
    fn place_converts_to_geojson_point() {
        let response: MapQuestResponse = serde_json::from_str(SAMPLE).unwrap();
        let location: GeoLocation = first_place(response).unwrap().into();

        assert_eq!(location.kind, "Point");
        assert_eq!(location.coordinates, vec![-71.105723, 42.350846]);
        assert_eq!(location.zipcode.as_deref(), Some("02215"));
    }

    #[actix_web::test]
    async fn missing_api_key_is_an_internal_error() {
        let geocoder = Geocoder::new(&test_settings()).unwrap();
        assert!(matches!(geocoder.geocode("02215").await, Err(ApiError::Internal(_))));
    }
}
