// lib.rs - Fleet dashboard core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod api;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod model;
pub mod normalize;
pub mod view;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crux_core::{App as CruxApp, Core};

pub use api::{ApiOperation, FetchError};
pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::ApiConfig;
pub use event::Event;
pub use model::{
    DrawerState, FormMode, FormState, ListState, Model, Notification, NotificationKind,
    TelemetrySample, TimeRange, Vehicle, VehicleFormValues, VehicleId,
};
pub use view::ViewModel;

pub const DEFAULT_RANGE_HOURS: i64 = 12;
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";
pub const SAVE_FALLBACK_MESSAGE: &str = "Unable to save vehicle";
pub const NAME_REQUIRED_MESSAGE: &str = "Name is required";
pub const CODE_REQUIRED_MESSAGE: &str = "Code is required to create a vehicle";

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AppError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Validation(String),
}

impl AppError {
    /// Text for a notification; `fallback` when the error carries none.
    #[must_use]
    pub fn user_facing_message(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub mod app {
    use super::*;
    use crate::capabilities::{HttpResult, JsonResult};
    use chrono::Utc;

    #[derive(Default)]
    pub struct App;

    impl App {
        fn reload_vehicles(model: &mut Model, caps: &Capabilities) {
            let request_seq = model.next_list_seq();
            Self::send_list_request(request_seq, model, caps);
        }

        fn send_list_request(request_seq: u64, model: &mut Model, caps: &Capabilities) {
            model.list = ListState::Loading;
            if let Err(e) = api::list_vehicles(caps, &model.config, request_seq) {
                Self::apply_vehicles(request_seq, Err(e), model);
            }
        }

        fn send_telemetry_request(model: &mut Model, caps: &Capabilities) {
            let Some(vehicle_id) = model.drawer_vehicle().map(|v| v.id.clone()) else {
                return;
            };
            let request_seq = model.next_telemetry_seq();

            model.telemetry_loading = true;
            if let Err(e) = api::fetch_telemetry(
                caps,
                &model.config,
                &vehicle_id,
                model.telemetry_range.as_ref(),
                request_seq,
            ) {
                model.telemetry_loading = false;
                Self::report_failure(&e, model, UNKNOWN_ERROR_MESSAGE);
            }
        }

        fn validate_form(mode: &FormMode, values: &VehicleFormValues) -> Result<(), AppError> {
            if values.name.trim().is_empty() {
                return Err(AppError::Validation(NAME_REQUIRED_MESSAGE.into()));
            }
            if *mode == FormMode::Create && values.code.trim().is_empty() {
                return Err(AppError::Validation(CODE_REQUIRED_MESSAGE.into()));
            }
            Ok(())
        }

        fn submit_form(values: VehicleFormValues, model: &mut Model, caps: &Capabilities) {
            let mode = match &model.form {
                FormState::Open { mode, .. } => mode.clone(),
                FormState::Submitting { .. } => {
                    tracing::warn!("form submitted while a save is in flight");
                    return;
                }
                FormState::Closed => {
                    tracing::warn!("form submitted while closed");
                    return;
                }
            };

            if let Err(e) = Self::validate_form(&mode, &values) {
                tracing::debug!(reason = %e, "form validation failed");
                model.notify_error(&e, UNKNOWN_ERROR_MESSAGE);
                model.form = FormState::Open { mode, values };
                return;
            }

            let name = values.name.trim();
            let sent = match &mode {
                FormMode::Create => {
                    api::create_vehicle(caps, &model.config, name, values.code.trim())
                }
                FormMode::Edit { vehicle_id } => {
                    api::update_vehicle(caps, &model.config, vehicle_id, name)
                }
            };

            match sent {
                Ok(()) => {
                    model.form = FormState::Submitting {
                        mode,
                        values,
                        reload_seq: None,
                    };
                }
                Err(e) => {
                    Self::report_failure(&e, model, SAVE_FALLBACK_MESSAGE);
                    model.form = FormState::Open { mode, values };
                }
            }
        }

        fn handle_save_response(
            op: ApiOperation,
            result: HttpResult,
            model: &mut Model,
            caps: &Capabilities,
        ) {
            match api::decode_saved_vehicle(op, result) {
                Ok(saved) => {
                    if let Some(vehicle) = saved {
                        tracing::info!(operation = op.name(), vehicle_id = %vehicle.id, "vehicle saved");
                        model.upsert_vehicle(vehicle);
                    }
                    let message = match op {
                        ApiOperation::CreateVehicle => "Vehicle created",
                        _ => "Vehicle updated",
                    };
                    model.notify(message, NotificationKind::Success);

                    let request_seq = model.next_list_seq();
                    if let FormState::Submitting { reload_seq, .. } = &mut model.form {
                        *reload_seq = Some(request_seq);
                    }
                    Self::send_list_request(request_seq, model, caps);
                }
                Err(e) => {
                    Self::report_failure(&e, model, SAVE_FALLBACK_MESSAGE);
                    model.form = match std::mem::take(&mut model.form) {
                        FormState::Submitting { mode, values, .. } => {
                            FormState::Open { mode, values }
                        }
                        other => other,
                    };
                }
            }
        }

        /// Returns `false` when the response belongs to a superseded list request.
        fn apply_vehicles(
            request_seq: u64,
            result: Result<Vec<Vehicle>, FetchError>,
            model: &mut Model,
        ) -> bool {
            if request_seq != model.list_request_seq {
                tracing::debug!(
                    request_seq,
                    latest = model.list_request_seq,
                    "discarding stale vehicle list"
                );
                return false;
            }

            match result {
                Ok(vehicles) => {
                    tracing::info!(count = vehicles.len(), "vehicles loaded");
                    model.vehicles = vehicles;
                    model.list = ListState::Loaded;
                    model.sync_drawer_vehicle();
                }
                Err(e) => {
                    model.list = ListState::Errored {
                        message: e.to_string(),
                    };
                    Self::report_failure(&e, model, UNKNOWN_ERROR_MESSAGE);
                }
            }

            // A later refresh supersedes the post-save reload, so it closes the form too.
            if let FormState::Submitting {
                reload_seq: Some(reload_seq),
                ..
            } = model.form
            {
                if request_seq >= reload_seq {
                    model.form = FormState::Closed;
                }
            }
            true
        }

        /// Returns `false` when the response belongs to a superseded request.
        fn handle_telemetry_response(
            request_seq: u64,
            result: JsonResult,
            model: &mut Model,
        ) -> bool {
            if request_seq != model.telemetry_request_seq {
                tracing::debug!(
                    request_seq,
                    latest = model.telemetry_request_seq,
                    "discarding stale telemetry response"
                );
                return false;
            }

            model.telemetry_loading = false;
            match api::decode_telemetry(result) {
                Ok(samples) => {
                    tracing::debug!(count = samples.len(), "telemetry loaded");
                    model.telemetry = samples;
                }
                Err(e) => Self::report_failure(&e, model, UNKNOWN_ERROR_MESSAGE),
            }
            true
        }

        fn report_failure(error: &FetchError, model: &mut Model, fallback: &str) {
            tracing::warn!(
                operation = error.operation.name(),
                detail = error.detail.as_deref().unwrap_or_default(),
                "{error}"
            );
            model.notify_error(&AppError::from(error.clone()), fallback);
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            let event_name = event.name();
            if event.is_user_initiated() {
                tracing::info!(event = event_name, "user action");
            } else {
                tracing::trace!(event = event_name, "capability response");
            }

            match event {
                Event::ConfigLoaded(config) => {
                    if let Err(e) = config.validate() {
                        tracing::warn!(error = %e, "API base URL is invalid; requests will fail");
                    }
                    model.config = config;
                }

                Event::AppStarted | Event::RefreshRequested => {
                    Self::reload_vehicles(model, caps);
                    caps.render.render();
                }

                Event::CreateFormOpened => {
                    if model.is_form_submitting() {
                        return;
                    }
                    model.form = FormState::Open {
                        mode: FormMode::Create,
                        values: VehicleFormValues::default(),
                    };
                    caps.render.render();
                }

                Event::EditFormOpened { vehicle_id } => {
                    if model.is_form_submitting() {
                        return;
                    }
                    let Some(values) = model.find_vehicle(&vehicle_id).map(VehicleFormValues::from_vehicle)
                    else {
                        tracing::warn!(%vehicle_id, "edit requested for unknown vehicle");
                        return;
                    };
                    model.form = FormState::Open {
                        mode: FormMode::Edit { vehicle_id },
                        values,
                    };
                    caps.render.render();
                }

                Event::FormCancelled => {
                    model.form = FormState::Closed;
                    caps.render.render();
                }

                Event::FormSubmitted(values) => {
                    Self::submit_form(values, model, caps);
                    caps.render.render();
                }

                Event::VehicleSelected { vehicle_id } => {
                    let Some(vehicle) = model.find_vehicle(&vehicle_id).cloned() else {
                        tracing::warn!(%vehicle_id, "telemetry requested for unknown vehicle");
                        return;
                    };
                    model.drawer = DrawerState::Open { vehicle };
                    model.telemetry.clear();
                    model.telemetry_range.get_or_insert_with(|| {
                        TimeRange::trailing_hours(Utc::now(), DEFAULT_RANGE_HOURS)
                    });
                    Self::send_telemetry_request(model, caps);
                    caps.render.render();
                }

                Event::DrawerClosed => {
                    model.drawer = DrawerState::Closed;
                    model.telemetry.clear();
                    model.telemetry_loading = false;
                    // Anything still in flight belongs to the closed session.
                    model.next_telemetry_seq();
                    caps.render.render();
                }

                Event::TelemetryRangeChanged { start, end } => {
                    let range = match TimeRange::new(start, end) {
                        Ok(range) => range,
                        Err(e) => {
                            tracing::warn!(error = %e, "ignoring telemetry range");
                            return;
                        }
                    };
                    model.telemetry_range = Some(range);
                    Self::send_telemetry_request(model, caps);
                    caps.render.render();
                }

                Event::NotificationDismissed => {
                    model.clear_notification();
                    caps.render.render();
                }

                Event::VehiclesLoaded {
                    request_seq,
                    result,
                } => {
                    if Self::apply_vehicles(request_seq, api::decode_vehicles(*result), model) {
                        caps.render.render();
                    }
                }

                Event::VehicleCreated(result) => {
                    Self::handle_save_response(ApiOperation::CreateVehicle, *result, model, caps);
                    caps.render.render();
                }

                Event::VehicleUpdated(result) => {
                    Self::handle_save_response(ApiOperation::UpdateVehicle, *result, model, caps);
                    caps.render.render();
                }

                Event::TelemetryLoaded {
                    request_seq,
                    result,
                } => {
                    if Self::handle_telemetry_response(request_seq, *result, model) {
                        caps.render.render();
                    }
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            ViewModel::from_model(model)
        }
    }
}
