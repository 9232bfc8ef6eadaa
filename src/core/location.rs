//! Location resolution - Turns map clicks and searches into a pickup address.
//!
//! The geocoding provider sits behind the [`Geocoder`] trait. [`MapboxGeocoder`] talks
//! to the Mapbox places API; tests plug in their own implementation.
//!
//! [`LocationPicker`] holds at most one candidate location. A map click or a confirmed
//! search replaces it. Provider failures are logged and leave the user free to type an
//! address by hand.

use crate::{
    config::Settings,
    errors::{Error, Result},
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MAPBOX_API: &str = "https://api.mapbox.com";

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
}

/// A resolved address with its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Human-readable address
    pub address: String,
    /// Where the address is
    pub coordinates: Coordinates,
}

/// Forward and reverse geocoding.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Free-text search, best match first.
    async fn forward(&self, query: &str) -> Result<Vec<Place>>;

    /// Address for a point, if the provider knows one.
    async fn reverse(&self, at: Coordinates) -> Result<Option<Place>>;
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    place_name: String,
    center: [f64; 2],
}

impl From<Feature> for Place {
    fn from(feature: Feature) -> Self {
        let [longitude, latitude] = feature.center;
        Self {
            address: feature.place_name,
            coordinates: Coordinates {
                longitude,
                latitude,
            },
        }
    }
}

/// Geocoder backed by the Mapbox places API.
#[derive(Debug, Clone)]
pub struct MapboxGeocoder {
    client: Client,
    base_url: Url,
    token: String,
    country: String,
}

impl MapboxGeocoder {
    /// Creates a geocoder using `token`, restricting forward search to `country`.
    pub fn new(token: impl Into<String>, country: impl Into<String>) -> Result<Self> {
        Self::with_base_url(MAPBOX_API, token, country)
    }

    /// Same as [`MapboxGeocoder::new`] against a different API host.
    pub fn with_base_url(
        base_url: &str,
        token: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| Error::Config {
            message: format!("invalid geocoder URL {base_url:?}: {e}"),
        })?;
        Ok(Self {
            client: Client::new(),
            base_url,
            token: token.into(),
            country: country.into(),
        })
    }

    /// Builds a geocoder from settings. `None` when no token is configured.
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        settings
            .mapbox_token
            .as_deref()
            .map(|token| Self::new(token, settings.geocoder_country.as_str()))
            .transpose()
    }

    fn places_url(&self, search: &str) -> Result<Url> {
        let file = format!("{search}.json");
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config {
                message: format!("geocoder URL {} cannot take a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(["geocoding", "v5", "mapbox.places", file.as_str()]);
        Ok(url)
    }

    async fn fetch(&self, url: Url, params: &[(&str, &str)]) -> Result<Vec<Place>> {
        debug!("Geocoding request to {}", url.path());
        let collection: FeatureCollection = self
            .client
            .get(url)
            .query(&[("access_token", self.token.as_str())])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(collection.features.into_iter().map(Place::from).collect())
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn forward(&self, query: &str) -> Result<Vec<Place>> {
        let url = self.places_url(query)?;
        self.fetch(url, &[("country", self.country.as_str())]).await
    }

    async fn reverse(&self, at: Coordinates) -> Result<Option<Place>> {
        let url = self.places_url(&format!("{},{}", at.longitude, at.latitude))?;
        Ok(self.fetch(url, &[]).await?.into_iter().next())
    }
}

/// Single-candidate location picker state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationPicker {
    marker: Option<Coordinates>,
    selected: Option<Place>,
}

impl LocationPicker {
    /// Creates an empty picker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            marker: None,
            selected: None,
        }
    }

    /// Moves the marker to `at` and reverse-geocodes it.
    ///
    /// Returns the new place when the provider resolved one. The marker moves even
    /// when geocoding fails; the previous address is then kept.
    pub async fn on_map_click(
        &mut self,
        geocoder: &dyn Geocoder,
        at: Coordinates,
    ) -> Option<Place> {
        self.marker = Some(at);
        match geocoder.reverse(at).await {
            Ok(Some(place)) => {
                let place = Place {
                    address: place.address,
                    coordinates: at,
                };
                self.selected = Some(place.clone());
                Some(place)
            }
            Ok(None) => {
                warn!("No address found at {},{}", at.longitude, at.latitude);
                None
            }
            Err(e) => {
                warn!("Reverse geocoding failed: {e}");
                None
            }
        }
    }

    /// Forward-geocodes `query` and takes the best match.
    ///
    /// A blank query does nothing. Misses and provider failures are logged and
    /// leave the current candidate in place.
    pub async fn search_and_confirm(
        &mut self,
        geocoder: &dyn Geocoder,
        query: &str,
    ) -> Option<Place> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        match geocoder.forward(query).await {
            Ok(places) => {
                let Some(place) = places.into_iter().next() else {
                    warn!("No geocoding match for {query:?}");
                    return None;
                };
                self.marker = Some(place.coordinates);
                self.selected = Some(place.clone());
                Some(place)
            }
            Err(e) => {
                warn!("Geocoding {query:?} failed: {e}");
                None
            }
        }
    }

    /// Where the marker is.
    #[must_use]
    pub const fn marker(&self) -> Option<Coordinates> {
        self.marker
    }

    /// The resolved candidate, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<&Place> {
        self.selected.as_ref()
    }

    /// Drops the marker and candidate.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
