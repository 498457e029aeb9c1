use assert_matches::assert_matches;
use chrono::{DateTime, Duration, TimeZone, Utc};
use crux_core::testing::AppTester;
use crux_http::http::StatusCode;
use crux_http::protocol::HttpRequest;
use crux_http::testing::ResponseBuilder;
use fleet_shared::{App, Effect, Event, Model, VehicleId};
use serde_json::{json, Value};
use url::Url;

type Tester = AppTester<App, Effect>;

fn telemetry(request_seq: u64, body: Value) -> Event {
    Event::TelemetryLoaded {
        request_seq,
        result: Box::new(Ok(ResponseBuilder::ok().body(body).build())),
    }
}

fn single_request(effects: Vec<Effect>) -> HttpRequest {
    let mut requests: Vec<HttpRequest> = effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some(request.operation),
            Effect::Render(_) => None,
        })
        .collect();
    assert_eq!(requests.len(), 1, "expected exactly one request");
    requests.remove(0)
}

fn query_bounds(request: &HttpRequest) -> (DateTime<Utc>, DateTime<Utc>) {
    let url = Url::parse(&request.url).unwrap();
    let param = |key: &str| {
        let (_, value) = url.query_pairs().find(|(k, _)| k == key).unwrap();
        DateTime::parse_from_rfc3339(&value).unwrap().with_timezone(&Utc)
    };
    (param("from"), param("to"))
}

fn with_fleet() -> (Tester, Model) {
    let app = Tester::default();
    let mut model = Model::default();
    app.update(Event::AppStarted, &mut model);
    app.update(
        Event::VehiclesLoaded {
            request_seq: model.list_request_seq,
            result: Box::new(Ok(ResponseBuilder::ok()
                .body(json!([
                    {"id": "v1", "name": "Van 5", "vehicle_code": "V005"},
                    {"id": "v2", "name": "Truck", "code": "T001"}
                ]))
                .build())),
        },
        &mut model,
    );
    (app, model)
}

/// Opens the drawer and returns the issued request with its sequence token.
fn select(app: &Tester, model: &mut Model, id: &str) -> (HttpRequest, u64) {
    let request = single_request(
        app.update(
            Event::VehicleSelected {
                vehicle_id: VehicleId::new(id),
            },
            model,
        )
        .effects,
    );
    (request, model.telemetry_request_seq)
}

#[test]
fn test_open_drawer_requests_trailing_twelve_hours() {
    let (app, mut model) = with_fleet();
    let (request, seq) = select(&app, &mut model, "v1");

    assert_eq!(request.method, "GET");
    assert!(request
        .url
        .starts_with("http://localhost:5500/api/vehicles/v1/telemetry?from="));
    let (from, to) = query_bounds(&request);
    assert_eq!(to - from, Duration::hours(12));
    assert!((Utc::now() - to) < Duration::minutes(1));

    let drawer = app.view(&model).drawer.unwrap();
    assert_eq!(drawer.title, "Van 5 telemetry");
    assert!(drawer.loading);

    app.update(
        telemetry(
            seq,
            json!({"items": [
                {"timestamp": "2024-05-01T10:00:00Z", "speed": 42, "lat": 52.1, "lon": 4.3}
            ]}),
        ),
        &mut model,
    );
    let drawer = app.view(&model).drawer.unwrap();
    assert!(!drawer.loading);
    assert_eq!(drawer.rows.len(), 1);
    assert_eq!(drawer.rows[0].timestamp, "May 1, 2024, 10:00");
    assert_eq!(drawer.rows[0].speed, "42");
    assert_eq!(drawer.rows[0].location, "52.1000, 4.3000");
}

#[test]
fn test_range_change_refetches_without_clearing() {
    let (app, mut model) = with_fleet();
    let (_, seq) = select(&app, &mut model, "v1");
    app.update(
        telemetry(seq, json!([{"ts": "2024-05-01T10:00:00Z", "speed": 10}])),
        &mut model,
    );

    let end = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
    let start = end - Duration::hours(3);
    let request = single_request(
        app.update(Event::TelemetryRangeChanged { start, end }, &mut model)
            .effects,
    );
    assert_eq!(query_bounds(&request), (start, end));

    // previous rows stay visible while the new window loads
    let drawer = app.view(&model).drawer.unwrap();
    assert_eq!(drawer.rows.len(), 1);
    assert!(drawer.loading);

    app.update(telemetry(model.telemetry_request_seq, json!([])), &mut model);
    assert!(app.view(&model).drawer.unwrap().rows.is_empty());
}

#[test]
fn test_stale_telemetry_response_is_discarded() {
    let (app, mut model) = with_fleet();
    let (_, first) = select(&app, &mut model, "v1");

    let end = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
    app.update(
        Event::TelemetryRangeChanged {
            start: end - Duration::hours(1),
            end,
        },
        &mut model,
    );
    let second = model.telemetry_request_seq;

    app.update(telemetry(second, json!([{"ts": "new", "speed": 2}])), &mut model);
    let update = app.update(telemetry(first, json!([{"ts": "old", "speed": 1}])), &mut model);
    assert!(update.effects.is_empty());

    let drawer = app.view(&model).drawer.unwrap();
    assert_eq!(drawer.rows.len(), 1);
    assert_eq!(drawer.rows[0].timestamp, "new");
    assert!(!drawer.loading);
}

#[test]
fn test_reselect_clears_and_keeps_range() {
    let (app, mut model) = with_fleet();
    let (request, seq) = select(&app, &mut model, "v1");
    let first_bounds = query_bounds(&request);
    app.update(telemetry(seq, json!([{"ts": "a"}])), &mut model);
    app.update(Event::DrawerClosed, &mut model);

    let (request, _) = select(&app, &mut model, "v2");
    assert!(request.url.contains("/vehicles/v2/telemetry"));
    assert_eq!(query_bounds(&request), first_bounds);
    assert_eq!(app.view(&model).drawer.unwrap().subtitle, "T001");
    assert!(model.telemetry.is_empty());
}

#[test]
fn test_switching_vehicle_with_drawer_open_clears_rows() {
    let (app, mut model) = with_fleet();
    let (_, v1_loaded) = select(&app, &mut model, "v1");
    app.update(telemetry(v1_loaded, json!([{"ts": "a"}, {"ts": "b"}])), &mut model);

    // v1 refetches, then the operator picks v2 without closing the drawer.
    let end = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
    app.update(
        Event::TelemetryRangeChanged {
            start: end - Duration::hours(2),
            end,
        },
        &mut model,
    );
    let v1_in_flight = model.telemetry_request_seq;

    let (request, v2_seq) = select(&app, &mut model, "v2");
    assert!(request.url.contains("/vehicles/v2/telemetry"));
    assert!(model.telemetry.is_empty());
    assert!(app.view(&model).drawer.unwrap().rows.is_empty());

    let update = app.update(telemetry(v1_in_flight, json!([{"ts": "late v1"}])), &mut model);
    assert!(update.effects.is_empty());
    assert!(model.telemetry.is_empty());
    let drawer = app.view(&model).drawer.unwrap();
    assert_eq!(drawer.vehicle_id, VehicleId::new("v2"));
    assert_eq!(drawer.title, "Truck telemetry");
    assert!(drawer.loading);

    app.update(telemetry(v2_seq, json!([{"ts": "v2 row"}])), &mut model);
    let drawer = app.view(&model).drawer.unwrap();
    assert_eq!(drawer.rows.len(), 1);
    assert_eq!(drawer.rows[0].timestamp, "v2 row");
}

#[test]
fn test_telemetry_failure_notifies_and_keeps_rows() {
    let (app, mut model) = with_fleet();
    let (_, seq) = select(&app, &mut model, "v1");
    app.update(telemetry(seq, json!([{"ts": "a"}])), &mut model);

    let end = Utc::now();
    app.update(
        Event::TelemetryRangeChanged {
            start: end - Duration::hours(6),
            end,
        },
        &mut model,
    );
    let update = app.update(
        Event::TelemetryLoaded {
            request_seq: model.telemetry_request_seq,
            result: Box::new(Ok(ResponseBuilder::with_status(StatusCode::NotFound)
                .body(json!({}))
                .build())),
        },
        &mut model,
    );
    assert_matches!(update.effects.as_slice(), [Effect::Render(_)]);

    let view = app.view(&model);
    assert_eq!(view.drawer.unwrap().rows.len(), 1);
    assert_eq!(
        view.notification.unwrap().message,
        "Unable to load telemetry history"
    );
}

#[test]
fn test_list_reload_refreshes_drawer_snapshot() {
    let (app, mut model) = with_fleet();
    select(&app, &mut model, "v1");

    app.update(Event::RefreshRequested, &mut model);
    app.update(
        Event::VehiclesLoaded {
            request_seq: model.list_request_seq,
            result: Box::new(Ok(ResponseBuilder::ok()
                .body(json!([{"id": "v1", "name": "Van 5B", "vehicle_code": "V005"}]))
                .build())),
        },
        &mut model,
    );
    assert_eq!(app.view(&model).drawer.unwrap().title, "Van 5B telemetry");
}
