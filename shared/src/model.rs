use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::AppError;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(VehicleId);

// --- Server records, as produced by the normalizer ---

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LatestTelemetry {
    pub ts: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub speed: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub code: Option<String>,
    pub latest_telemetry: Option<LatestTelemetry>,
}

impl Vehicle {
    /// Code when the server sent a non-empty one, otherwise the id.
    #[must_use]
    pub fn label(&self) -> &str {
        match self.code.as_deref() {
            Some(code) if !code.is_empty() => code,
            _ => self.id.as_str(),
        }
    }
}

/// One reading from the telemetry history. `timestamp` is empty when the server sent none.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TelemetrySample {
    pub timestamp: String,
    pub speed: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

// --- Telemetry query window ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("time range start {start} is after end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A closed query window with `start <= end`. Deserialization goes through
/// [`TimeRange::new`], so an inverted pair never makes it into a model.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawTimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = RangeError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// `[end - hours, end]`.
    #[must_use]
    pub fn trailing_hours(end: DateTime<Utc>, hours: i64) -> Self {
        Self {
            start: end - Duration::hours(hours.max(0)),
            end,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Query-string form of the lower bound, e.g. `2024-05-01T10:00:00.000Z`.
    pub fn from_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn to_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

// --- View state machines ---

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum ListState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored {
        message: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { vehicle_id: VehicleId },
}

/// What the operator typed. `code` is ignored when editing.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct VehicleFormValues {
    pub name: String,
    pub code: String,
}

impl VehicleFormValues {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    #[must_use]
    pub fn from_vehicle(vehicle: &Vehicle) -> Self {
        Self {
            name: vehicle.name.clone(),
            code: vehicle.code.clone().unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum FormState {
    #[default]
    Closed,
    Open {
        mode: FormMode,
        values: VehicleFormValues,
    },
    /// `reload_seq` is set once the mutation succeeded: it is the list request
    /// issued after the save, and the form closes when that reload resolves.
    Submitting {
        mode: FormMode,
        values: VehicleFormValues,
        reload_seq: Option<u64>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub enum DrawerState {
    #[default]
    Closed,
    Open {
        vehicle: Vehicle,
    },
}

// --- Notifications ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

impl NotificationKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Success => 2000,
            Self::Error => 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub duration_ms: u64,
}

impl Notification {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            message: message.into(),
            kind,
            duration_ms: kind.default_duration_ms(),
        }
    }
}

/// The whole view state, owned by the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    pub config: ApiConfig,

    pub vehicles: Vec<Vehicle>,
    pub list: ListState,
    /// Sequence number of the most recently issued list request.
    pub list_request_seq: u64,

    pub form: FormState,

    pub drawer: DrawerState,
    pub telemetry: Vec<TelemetrySample>,
    pub telemetry_range: Option<TimeRange>,
    pub telemetry_loading: bool,
    /// Sequence number of the most recently issued telemetry request.
    pub telemetry_request_seq: u64,

    pub notification: Option<Notification>,
}

impl Model {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: NotificationKind) {
        self.notification = Some(Notification::new(message, kind));
    }

    pub fn notify_error(&mut self, error: &AppError, fallback: &str) {
        self.notify(error.user_facing_message(fallback), NotificationKind::Error);
    }

    pub fn clear_notification(&mut self) {
        self.notification = None;
    }

    #[must_use]
    pub fn find_vehicle(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| &v.id == id)
    }

    /// Replaces the vehicle with the same id, or appends it.
    pub fn upsert_vehicle(&mut self, vehicle: Vehicle) {
        match self.vehicles.iter_mut().find(|v| v.id == vehicle.id) {
            Some(existing) => *existing = vehicle,
            None => self.vehicles.push(vehicle),
        }
    }

    /// Points an open drawer at the list's current copy of its vehicle.
    pub fn sync_drawer_vehicle(&mut self) {
        if let DrawerState::Open { vehicle } = &mut self.drawer {
            if let Some(fresh) = self.vehicles.iter().find(|v| v.id == vehicle.id) {
                vehicle.clone_from(fresh);
            }
        }
    }

    #[must_use]
    pub fn drawer_vehicle(&self) -> Option<&Vehicle> {
        match &self.drawer {
            DrawerState::Open { vehicle } => Some(vehicle),
            DrawerState::Closed => None,
        }
    }

    #[must_use]
    pub fn is_list_loading(&self) -> bool {
        self.list == ListState::Loading
    }

    #[must_use]
    pub fn is_form_submitting(&self) -> bool {
        matches!(self.form, FormState::Submitting { .. })
    }

    /// Hands out the sequence number for a new list request, superseding older ones.
    pub fn next_list_seq(&mut self) -> u64 {
        self.list_request_seq += 1;
        self.list_request_seq
    }

    /// Hands out the sequence number for a new telemetry request, superseding older ones.
    pub fn next_telemetry_seq(&mut self) -> u64 {
        self.telemetry_request_seq += 1;
        self.telemetry_request_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn time_range_rejects_inverted_bounds() {
        assert!(TimeRange::new(at(10), at(12)).is_ok());
        assert!(TimeRange::new(at(10), at(10)).is_ok());
        assert_eq!(
            TimeRange::new(at(12), at(10)),
            Err(RangeError::Inverted {
                start: at(12),
                end: at(10)
            })
        );
    }

    #[test]
    fn time_range_deserialization_is_validated() {
        let range: TimeRange = serde_json::from_str(
            r#"{"start":"2024-05-01T10:00:00Z","end":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(range, TimeRange::new(at(10), at(12)).unwrap());

        let err = serde_json::from_str::<TimeRange>(
            r#"{"start":"2024-05-01T12:00:00Z","end":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("is after end"));
    }

    #[test]
    fn time_range_params_are_iso_millis() {
        let range = TimeRange::trailing_hours(at(12), 12);
        assert_eq!(range.from_param(), "2024-05-01T00:00:00.000Z");
        assert_eq!(range.to_param(), "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn vehicle_label_falls_back_to_id() {
        let mut vehicle = Vehicle {
            id: VehicleId::new("v1"),
            name: "Van".into(),
            code: Some("V005".into()),
            latest_telemetry: None,
        };
        assert_eq!(vehicle.label(), "V005");
        vehicle.code = Some(String::new());
        assert_eq!(vehicle.label(), "v1");
        vehicle.code = None;
        assert_eq!(vehicle.label(), "v1");
    }

    #[test]
    fn form_values_prefill_from_vehicle() {
        let vehicle = Vehicle {
            id: VehicleId::new("v1"),
            name: "Van".into(),
            code: None,
            latest_telemetry: None,
        };
        assert_eq!(
            VehicleFormValues::from_vehicle(&vehicle),
            VehicleFormValues::new("Van", "")
        );
    }

    #[test]
    fn upsert_replaces_by_id_and_syncs_drawer() {
        let van = |name: &str| Vehicle {
            id: VehicleId::new("v1"),
            name: name.into(),
            code: None,
            latest_telemetry: None,
        };
        let mut model = Model {
            drawer: DrawerState::Open { vehicle: van("Van 5") },
            ..Model::default()
        };
        model.upsert_vehicle(van("Van 5"));
        model.upsert_vehicle(van("Van 6"));
        assert_eq!(model.vehicles.len(), 1);
        assert_eq!(model.vehicles[0].name, "Van 6");

        model.sync_drawer_vehicle();
        assert_eq!(model.drawer_vehicle().map(|v| v.name.as_str()), Some("Van 6"));
    }

    #[test]
    fn list_seq_is_independent_of_telemetry_seq() {
        let mut model = Model::default();
        assert_eq!(model.next_list_seq(), 1);
        assert_eq!(model.next_telemetry_seq(), 1);
        assert_eq!(model.next_list_seq(), 2);
        assert_eq!(model.list_request_seq, 2);
    }

    #[test]
    fn telemetry_seq_is_monotonic() {
        let mut model = Model::default();
        let first = model.next_telemetry_seq();
        let second = model.next_telemetry_seq();
        assert!(second > first);
        assert_eq!(model.telemetry_request_seq, second);
    }
}
