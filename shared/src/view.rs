//! Presentation data derived from [`Model`]. Formatting only: no field here is
//! computed from anything the normalizer didn't produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    DrawerState, FormMode, FormState, ListState, Model, Notification, TelemetrySample, TimeRange,
    Vehicle, VehicleFormValues, VehicleId,
};

pub const PLACEHOLDER: &str = "—";
const TIMESTAMP_FORMAT: &str = "%b %-d, %Y, %H:%M";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VehicleRow {
    pub id: VehicleId,
    pub name: String,
    pub subtitle: String,
    pub speed: String,
    pub location: String,
    pub last_updated: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRow {
    pub key: String,
    pub timestamp: String,
    pub speed: String,
    pub location: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RangeView {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DrawerView {
    pub vehicle_id: VehicleId,
    pub title: String,
    pub subtitle: String,
    pub range: Option<RangeView>,
    pub rows: Vec<TelemetryRow>,
    pub loading: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FormView {
    pub title: String,
    pub submit_label: String,
    pub values: VehicleFormValues,
    pub code_editable: bool,
    pub submitting: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewModel {
    pub vehicles: Vec<VehicleRow>,
    pub list_loading: bool,
    pub list_error: Option<String>,
    pub empty_text: String,
    pub form: Option<FormView>,
    pub drawer: Option<DrawerView>,
    pub notification: Option<Notification>,
}

impl ViewModel {
    #[must_use]
    pub fn from_model(model: &Model) -> Self {
        let list_error = match &model.list {
            ListState::Errored { message } => Some(message.clone()),
            _ => None,
        };
        let empty_text = if list_error.is_some() {
            "Unable to load vehicles"
        } else {
            "No vehicles found"
        };

        Self {
            vehicles: model.vehicles.iter().map(VehicleRow::from_vehicle).collect(),
            list_loading: model.is_list_loading(),
            list_error,
            empty_text: empty_text.to_string(),
            form: FormView::from_state(&model.form),
            drawer: DrawerView::from_model(model),
            notification: model.notification.clone(),
        }
    }
}

impl VehicleRow {
    #[must_use]
    pub fn from_vehicle(vehicle: &Vehicle) -> Self {
        let latest = vehicle.latest_telemetry.as_ref();
        Self {
            id: vehicle.id.clone(),
            name: vehicle.name.clone(),
            subtitle: vehicle.label().to_string(),
            speed: format_speed(latest.and_then(|t| t.speed)),
            location: format_location(latest.and_then(|t| t.lat), latest.and_then(|t| t.lon)),
            last_updated: format_timestamp(latest.and_then(|t| t.ts.as_deref()).unwrap_or("")),
        }
    }
}

impl TelemetryRow {
    #[must_use]
    pub fn from_sample(sample: &TelemetrySample) -> Self {
        Self {
            key: telemetry_row_key(sample),
            timestamp: format_timestamp(&sample.timestamp),
            speed: format_speed(sample.speed),
            location: format_location(sample.lat, sample.lon),
        }
    }
}

impl DrawerView {
    fn from_model(model: &Model) -> Option<Self> {
        let DrawerState::Open { vehicle } = &model.drawer else {
            return None;
        };
        Some(Self {
            vehicle_id: vehicle.id.clone(),
            title: format!("{} telemetry", vehicle.name),
            subtitle: vehicle.label().to_string(),
            range: model.telemetry_range.as_ref().map(RangeView::from_range),
            rows: model.telemetry.iter().map(TelemetryRow::from_sample).collect(),
            loading: model.telemetry_loading,
        })
    }
}

impl RangeView {
    fn from_range(range: &TimeRange) -> Self {
        Self {
            start: range.start(),
            end: range.end(),
            label: format!(
                "{} to {}",
                range.start().format(TIMESTAMP_FORMAT),
                range.end().format(TIMESTAMP_FORMAT)
            ),
        }
    }
}

impl FormView {
    fn from_state(state: &FormState) -> Option<Self> {
        let (mode, values, submitting) = match state {
            FormState::Closed => return None,
            FormState::Open { mode, values } => (mode, values, false),
            FormState::Submitting { mode, values, .. } => (mode, values, true),
        };
        let (title, submit_label, code_editable) = match mode {
            FormMode::Create => ("New Vehicle", "Create Vehicle", true),
            FormMode::Edit { .. } => ("Edit Vehicle", "Save Changes", false),
        };
        Some(Self {
            title: title.to_string(),
            submit_label: submit_label.to_string(),
            values: values.clone(),
            code_editable,
            submitting,
        })
    }
}

/// RFC 3339 input renders as e.g. `May 1, 2024, 10:00` (UTC). Anything else is shown as given.
#[must_use]
pub fn format_timestamp(value: &str) -> String {
    if value.is_empty() {
        return PLACEHOLDER.to_string();
    }
    match DateTime::parse_from_rfc3339(value) {
        Ok(parsed) => parsed.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string(),
        Err(_) => value.to_string(),
    }
}

#[must_use]
pub fn format_speed(speed: Option<f64>) -> String {
    speed.map_or_else(|| PLACEHOLDER.to_string(), |s| s.to_string())
}

/// `"lat, lon"` to four decimals; both coordinates or nothing.
#[must_use]
pub fn format_location(lat: Option<f64>, lon: Option<f64>) -> String {
    match (lat, lon) {
        (Some(lat), Some(lon)) => format!("{lat:.4}, {lon:.4}"),
        _ => PLACEHOLDER.to_string(),
    }
}

#[must_use]
pub fn telemetry_row_key(sample: &TelemetrySample) -> String {
    fn part(value: Option<f64>, absent: &str) -> String {
        value.map_or_else(|| absent.to_string(), |v| v.to_string())
    }
    format!(
        "{}-{}-{}-{}",
        sample.timestamp,
        part(sample.lat, "lat"),
        part(sample.lon, "lon"),
        part(sample.speed, "speed")
    )
}
