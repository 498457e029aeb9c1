//! Turns loosely shaped server JSON into stable local records.
//!
//! Collections may arrive bare (`[...]`) or wrapped (`{"items": [...]}`,
//! `{"data": [...]}`). Field names also vary between server versions, so every
//! record goes through one resolution step here and nowhere else.

use serde_json::Value;
use thiserror::Error;

use crate::model::{LatestTelemetry, TelemetrySample, Vehicle, VehicleId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("vehicle record {index} has no usable id")]
    MissingIdentity { index: usize },
}

/// Outer shape of a collection response, decided once per response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope<'a> {
    Bare(&'a [Value]),
    Items(&'a [Value]),
    Data(&'a [Value]),
    Unrecognized,
}

impl<'a> Envelope<'a> {
    /// Resolution order: bare array, then `items`, then `data`.
    pub fn classify(value: &'a Value) -> Self {
        if let Value::Array(records) = value {
            return Self::Bare(records);
        }
        if let Some(Value::Array(records)) = value.get("items") {
            return Self::Items(records);
        }
        if let Some(Value::Array(records)) = value.get("data") {
            return Self::Data(records);
        }
        Self::Unrecognized
    }

    pub fn records(&self) -> &'a [Value] {
        match self {
            Self::Bare(records) | Self::Items(records) | Self::Data(records) => records,
            Self::Unrecognized => &[],
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bare(_) => "array",
            Self::Items(_) => "items",
            Self::Data(_) => "data",
            Self::Unrecognized => "unrecognized",
        }
    }
}

pub fn normalize_vehicles(value: &Value) -> Result<Vec<Vehicle>, NormalizeError> {
    let envelope = Envelope::classify(value);
    tracing::trace!(envelope = envelope.kind(), "normalizing vehicles");

    envelope
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            vehicle_from_record(record).ok_or(NormalizeError::MissingIdentity { index })
        })
        .collect()
}

/// Single-record form, used for create/update responses.
pub fn normalize_vehicle(value: &Value) -> Result<Vehicle, NormalizeError> {
    vehicle_from_record(value).ok_or(NormalizeError::MissingIdentity { index: 0 })
}

pub fn normalize_telemetry(value: &Value) -> Vec<TelemetrySample> {
    let envelope = Envelope::classify(value);
    tracing::trace!(envelope = envelope.kind(), "normalizing telemetry");

    envelope.records().iter().map(sample_from_record).collect()
}

fn vehicle_from_record(record: &Value) -> Option<Vehicle> {
    let id = match record.get("id")? {
        Value::String(id) => id.clone(),
        // Only integral ids have a canonical string form.
        Value::Number(id) => match (id.as_u64(), id.as_i64()) {
            (Some(id), _) => id.to_string(),
            (None, Some(id)) => id.to_string(),
            (None, None) => return None,
        },
        _ => return None,
    };

    Some(Vehicle {
        id: VehicleId::new(id),
        name: string_field(record, "name").unwrap_or_default(),
        code: string_field(record, "vehicle_code").or_else(|| string_field(record, "code")),
        latest_telemetry: record
            .get("latestTelemetry")
            .filter(|v| v.is_object())
            .map(|latest| LatestTelemetry {
                ts: string_field(latest, "ts"),
                lat: number_field(latest, "lat"),
                lon: number_field(latest, "lon"),
                speed: number_field(latest, "speed"),
            }),
    })
}

fn sample_from_record(record: &Value) -> TelemetrySample {
    TelemetrySample {
        timestamp: string_field(record, "timestamp")
            .or_else(|| string_field(record, "ts"))
            .unwrap_or_default(),
        speed: number_field(record, "speed"),
        lat: number_field(record, "lat"),
        lon: number_field(record, "lon"),
    }
}

fn string_field(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn number_field(record: &Value, key: &str) -> Option<f64> {
    record.get(key).and_then(Value::as_f64)
}
