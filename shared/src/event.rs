use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capabilities::{HttpResult, JsonResult};
use crate::config::ApiConfig;
use crate::model::{VehicleFormValues, VehicleId};

// --- Event enum: shell-facing variants first, response variants boxed ---

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Event {
    // Lifecycle
    ConfigLoaded(ApiConfig),
    AppStarted,
    RefreshRequested,

    // Vehicle form
    CreateFormOpened,
    EditFormOpened {
        vehicle_id: VehicleId,
    },
    FormCancelled,
    FormSubmitted(VehicleFormValues),

    // Telemetry drawer
    VehicleSelected {
        vehicle_id: VehicleId,
    },
    DrawerClosed,
    TelemetryRangeChanged {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    NotificationDismissed,

    // Capability responses. Only the core creates these.
    #[serde(skip)]
    VehiclesLoaded {
        request_seq: u64,
        result: Box<JsonResult>,
    },
    #[serde(skip)]
    VehicleCreated(Box<HttpResult>),
    #[serde(skip)]
    VehicleUpdated(Box<HttpResult>),
    #[serde(skip)]
    TelemetryLoaded {
        request_seq: u64,
        result: Box<JsonResult>,
    },
}

impl Event {
    /// Stable name for log fields.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ConfigLoaded(_) => "config_loaded",
            Self::AppStarted => "app_started",
            Self::RefreshRequested => "refresh_requested",
            Self::CreateFormOpened => "create_form_opened",
            Self::EditFormOpened { .. } => "edit_form_opened",
            Self::FormCancelled => "form_cancelled",
            Self::FormSubmitted(_) => "form_submitted",
            Self::VehicleSelected { .. } => "vehicle_selected",
            Self::DrawerClosed => "drawer_closed",
            Self::TelemetryRangeChanged { .. } => "telemetry_range_changed",
            Self::NotificationDismissed => "notification_dismissed",
            Self::VehiclesLoaded { .. } => "vehicles_loaded",
            Self::VehicleCreated(_) => "vehicle_created",
            Self::VehicleUpdated(_) => "vehicle_updated",
            Self::TelemetryLoaded { .. } => "telemetry_loaded",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::VehiclesLoaded { .. }
                | Self::VehicleCreated(_)
                | Self::VehicleUpdated(_)
                | Self::TelemetryLoaded { .. }
        )
    }
}
