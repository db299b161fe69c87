//! Decoding raw claim payloads into geometries.

use geo::{Geometry, Point};
use serde_json::Value;
use thiserror::Error;

/// Globe identifier Wikidata uses for coordinates on Earth.
pub const EARTH_GLOBE: &str = "http://www.wikidata.org/entity/Q2";

/// Errors raised when a payload is malformed.
///
/// Payloads that are well-formed but describe something the decoder does not
/// handle are reported as `Ok(None)` instead.
#[derive(Debug, Clone, Error, PartialEq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The payload was not a JSON object.
    #[error("geometry payload must be a JSON object")]
    NotAnObject,
    /// A required field was absent.
    #[error("geometry payload is missing `{field}`")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field held a value of the wrong type.
    #[error("geometry payload field `{field}` has an unexpected type")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The coordinates fell outside the WGS84 range.
    #[error("coordinate ({latitude}, {longitude}) is outside the valid range")]
    OutOfRange {
        /// Decoded latitude in degrees.
        latitude: f64,
        /// Decoded longitude in degrees.
        longitude: f64,
    },
}

/// Turns a raw fact payload into a geometry.
pub trait GeometryDecoder {
    /// Decode `payload`.
    ///
    /// Returns `Ok(None)` for payloads the decoder does not recognise and
    /// `Err` for payloads that are malformed.
    fn decode(&self, payload: &Value) -> Result<Option<Geometry<f64>>, DecodeError>;
}

/// Decoder for Wikidata `globe-coordinate` values.
///
/// Accepts either the full data value (`{"type": "globecoordinate", "value":
/// {...}}`) or the bare value object. Coordinates on other globes decode to
/// `None`; points use `x = longitude`, `y = latitude`.
///
/// # Examples
/// ```
/// use geo::{Geometry, Point};
/// use serde_json::json;
/// use wikigeo_core::{GeometryDecoder, WikidataCoordinateDecoder};
///
/// let payload = json!({
///     "latitude": 52.516666666667,
///     "longitude": 13.383333333333,
///     "globe": "http://www.wikidata.org/entity/Q2"
/// });
/// let geometry = WikidataCoordinateDecoder.decode(&payload)?;
/// assert_eq!(
///     geometry,
///     Some(Geometry::Point(Point::new(13.383333333333, 52.516666666667)))
/// );
/// # Ok::<(), wikigeo_core::DecodeError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WikidataCoordinateDecoder;

impl GeometryDecoder for WikidataCoordinateDecoder {
    fn decode(&self, payload: &Value) -> Result<Option<Geometry<f64>>, DecodeError> {
        let object = payload.as_object().ok_or(DecodeError::NotAnObject)?;
        let value = match object.get("type").and_then(Value::as_str) {
            Some("globecoordinate") => object
                .get("value")
                .ok_or(DecodeError::MissingField { field: "value" })?,
            Some(_) => return Ok(None),
            None => payload,
        };
        let value = value.as_object().ok_or(DecodeError::InvalidField { field: "value" })?;

        match value.get("globe") {
            None | Some(Value::Null) => {}
            Some(Value::String(globe)) if is_earth(globe) => {}
            Some(Value::String(_)) => return Ok(None),
            Some(_) => return Err(DecodeError::InvalidField { field: "globe" }),
        }

        let latitude = number_field(value, "latitude")?;
        let longitude = number_field(value, "longitude")?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(DecodeError::OutOfRange {
                latitude,
                longitude,
            });
        }
        Ok(Some(Geometry::Point(Point::new(longitude, latitude))))
    }
}

fn is_earth(globe: &str) -> bool {
    let globe = globe.trim();
    globe == EARTH_GLOBE
        || globe == "https://www.wikidata.org/entity/Q2"
        || globe.eq_ignore_ascii_case("earth")
}

fn number_field(
    value: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<f64, DecodeError> {
    let raw = value.get(field).ok_or(DecodeError::MissingField { field })?;
    let number = raw.as_f64().ok_or(DecodeError::InvalidField { field })?;
    if number.is_finite() {
        Ok(number)
    } else {
        Err(DecodeError::InvalidField { field })
    }
}
