//! The four REST calls the dashboard makes.
//!
//! Each call is split in two halves: a send function that builds the URL and
//! hands the request to `crux_http`, and a `decode_*` function that turns the
//! resolved response into typed records. Every failure of a call collapses
//! into the same [`FetchError`] for that call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::capabilities::{Capabilities, HttpResult, JsonResult, ValidatedUrl};
use crate::config::ApiConfig;
use crate::event::Event;
use crate::model::{TelemetrySample, TimeRange, Vehicle, VehicleId};
use crate::normalize::{normalize_telemetry, normalize_vehicle, normalize_vehicles};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiOperation {
    ListVehicles,
    CreateVehicle,
    UpdateVehicle,
    FetchTelemetry,
}

impl ApiOperation {
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::ListVehicles => "Unable to load vehicles",
            Self::CreateVehicle => "Unable to create vehicle",
            Self::UpdateVehicle => "Unable to update vehicle",
            Self::FetchTelemetry => "Unable to load telemetry history",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ListVehicles => "list_vehicles",
            Self::CreateVehicle => "create_vehicle",
            Self::UpdateVehicle => "update_vehicle",
            Self::FetchTelemetry => "fetch_telemetry",
        }
    }
}

/// A failed call. Displays only the fixed per-operation message; `detail` is for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}", .operation.failure_message())]
pub struct FetchError {
    pub operation: ApiOperation,
    pub detail: Option<String>,
}

impl FetchError {
    #[must_use]
    pub fn new(operation: ApiOperation) -> Self {
        Self {
            operation,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.operation.failure_message()
    }
}

#[derive(Debug, Serialize)]
struct CreateVehiclePayload<'a> {
    name: &'a str,
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateVehiclePayload<'a> {
    name: &'a str,
}

/// `GET {base}/vehicles`
pub fn list_vehicles(
    caps: &Capabilities,
    config: &ApiConfig,
    request_seq: u64,
) -> Result<(), FetchError> {
    let url = vehicles_url(config, ApiOperation::ListVehicles)?;
    caps.http
        .get(url.as_str())
        .expect_json::<Value>()
        .send(move |result| Event::VehiclesLoaded {
            request_seq,
            result: Box::new(result),
        });
    Ok(())
}

/// `POST {base}/vehicles` with `{name, code}`. The caller checks `code` is present.
pub fn create_vehicle(
    caps: &Capabilities,
    config: &ApiConfig,
    name: &str,
    code: &str,
) -> Result<(), FetchError> {
    let op = ApiOperation::CreateVehicle;
    let url = vehicles_url(config, op)?;
    let body = json_payload(op, &CreateVehiclePayload { name, code })?;
    caps.http
        .post(url.as_str())
        .header("Content-Type", "application/json")
        .body(body)
        .send(|result| Event::VehicleCreated(Box::new(result)));
    Ok(())
}

/// `PUT {base}/vehicles/{id}` with `{name}`; the code never changes after creation.
pub fn update_vehicle(
    caps: &Capabilities,
    config: &ApiConfig,
    id: &VehicleId,
    name: &str,
) -> Result<(), FetchError> {
    let op = ApiOperation::UpdateVehicle;
    let url = vehicle_url(config, op, id)?;
    let body = json_payload(op, &UpdateVehiclePayload { name })?;
    caps.http
        .put(url.as_str())
        .header("Content-Type", "application/json")
        .body(body)
        .send(|result| Event::VehicleUpdated(Box::new(result)));
    Ok(())
}

/// `GET {base}/vehicles/{id}/telemetry[?from=..&to=..]`. The response is tagged
/// with `request_seq` so a superseded fetch can be recognised.
pub fn fetch_telemetry(
    caps: &Capabilities,
    config: &ApiConfig,
    id: &VehicleId,
    range: Option<&TimeRange>,
    request_seq: u64,
) -> Result<(), FetchError> {
    let url = telemetry_url(config, id, range)?;
    caps.http
        .get(url.as_str())
        .expect_json::<Value>()
        .send(move |result| Event::TelemetryLoaded {
            request_seq,
            result: Box::new(result),
        });
    Ok(())
}

pub fn vehicles_url(config: &ApiConfig, op: ApiOperation) -> Result<ValidatedUrl, FetchError> {
    endpoint(config, op, &["vehicles"])
}

pub fn vehicle_url(
    config: &ApiConfig,
    op: ApiOperation,
    id: &VehicleId,
) -> Result<ValidatedUrl, FetchError> {
    endpoint(config, op, &["vehicles", id.as_str()])
}

pub fn telemetry_url(
    config: &ApiConfig,
    id: &VehicleId,
    range: Option<&TimeRange>,
) -> Result<ValidatedUrl, FetchError> {
    let op = ApiOperation::FetchTelemetry;
    let mut url = base_url(config, op)?;
    push_segments(&mut url, op, &["vehicles", id.as_str(), "telemetry"])?;
    if let Some(range) = range {
        url.query_pairs_mut()
            .append_pair("from", &range.from_param())
            .append_pair("to", &range.to_param());
    }
    validated(&url, op)
}

pub fn decode_vehicles(result: JsonResult) -> Result<Vec<Vehicle>, FetchError> {
    let op = ApiOperation::ListVehicles;
    let value = json_body(op, successful_response(op, result)?)?;
    normalize_vehicles(&value).map_err(|e| FetchError::new(op).with_detail(e.to_string()))
}

pub fn decode_telemetry(result: JsonResult) -> Result<Vec<TelemetrySample>, FetchError> {
    let op = ApiOperation::FetchTelemetry;
    let value = json_body(op, successful_response(op, result)?)?;
    Ok(normalize_telemetry(&value))
}

/// Decodes a create/update response. The write already happened once the
/// status is 2xx, so a body that isn't a recognisable vehicle yields `None`.
pub fn decode_saved_vehicle(
    op: ApiOperation,
    result: HttpResult,
) -> Result<Option<Vehicle>, FetchError> {
    let mut response = successful_response(op, result)?;
    let body = response.take_body().unwrap_or_default();
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let vehicle = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|value| normalize_vehicle(&value).ok());
    if vehicle.is_none() {
        tracing::warn!(operation = op.name(), "saved vehicle response had no vehicle record");
    }
    Ok(vehicle)
}

fn successful_response<T>(
    op: ApiOperation,
    result: crux_http::Result<crux_http::Response<T>>,
) -> Result<crux_http::Response<T>, FetchError> {
    match result {
        Ok(response) if response.status().is_success() => Ok(response),
        Ok(response) => {
            Err(FetchError::new(op).with_detail(format!("HTTP status {}", response.status())))
        }
        Err(e) => Err(FetchError::new(op).with_detail(e.to_string())),
    }
}

fn json_body(op: ApiOperation, mut response: crux_http::Response<Value>) -> Result<Value, FetchError> {
    response
        .take_body()
        .ok_or_else(|| FetchError::new(op).with_detail("response had no body"))
}

fn json_payload(op: ApiOperation, payload: &impl Serialize) -> Result<Vec<u8>, FetchError> {
    serde_json::to_vec(payload).map_err(|e| FetchError::new(op).with_detail(e.to_string()))
}

fn endpoint(
    config: &ApiConfig,
    op: ApiOperation,
    segments: &[&str],
) -> Result<ValidatedUrl, FetchError> {
    let mut url = base_url(config, op)?;
    push_segments(&mut url, op, segments)?;
    validated(&url, op)
}

fn base_url(config: &ApiConfig, op: ApiOperation) -> Result<Url, FetchError> {
    config
        .validate()
        .map(ValidatedUrl::into_url)
        .map_err(|e| FetchError::new(op).with_detail(e.to_string()))
}

fn push_segments(url: &mut Url, op: ApiOperation, segments: &[&str]) -> Result<(), FetchError> {
    url.path_segments_mut()
        .map_err(|()| FetchError::new(op).with_detail("base URL cannot carry a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(())
}

fn validated(url: &Url, op: ApiOperation) -> Result<ValidatedUrl, FetchError> {
    ValidatedUrl::from_url(url).map_err(|e| FetchError::new(op).with_detail(e.to_string()))
}
