//! Drives the core: dispatches events, performs HTTP effects with `reqwest`
//! and resolves each outcome back into the core until nothing is left to do.

use std::collections::VecDeque;
use std::time::Duration;

use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use fleet_shared::{ApiConfig, App, Capabilities, Core, Effect, Event, ViewModel};

/// Status handed back to the core when the request never produced a response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 503;

pub struct Shell {
    core: Core<Effect, App>,
    client: reqwest::Client,
}

impl Shell {
    pub async fn new(config: ApiConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let mut shell = Self {
            core: Core::new::<Capabilities>(),
            client,
        };
        shell.dispatch(Event::ConfigLoaded(config)).await;
        Ok(shell)
    }

    /// Sends `event` and runs every resulting effect to completion.
    pub async fn dispatch(&mut self, event: Event) {
        let mut queue: VecDeque<Effect> = self.core.process_event(event).into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Render(_) => tracing::trace!("render"),
                Effect::Http(mut request) => {
                    let response = execute(&self.client, &request.operation).await;
                    queue.extend(self.core.resolve(&mut request, HttpResult::Ok(response)));
                }
            }
        }
    }

    #[must_use]
    pub fn view(&self) -> ViewModel {
        self.core.view()
    }
}

/// Performs one request. Any status code is a response; a transport failure
/// becomes [`TRANSPORT_FAILURE_STATUS`] with the error text as body.
pub async fn execute(client: &reqwest::Client, request: &HttpRequest) -> HttpResponse {
    let method = match reqwest::Method::from_bytes(request.method.as_bytes()) {
        Ok(method) => method,
        Err(e) => return transport_failure(request, &e),
    };

    let mut builder = client.request(method, &request.url);
    for header in &request.headers {
        builder = builder.header(&header.name, &header.value);
    }
    if !request.body.is_empty() {
        builder = builder.body(request.body.clone());
    }

    tracing::debug!(method = %request.method, url = %request.url, "sending request");
    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => return transport_failure(request, &e),
    };

    let status = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return transport_failure(request, &e),
    };

    tracing::debug!(status, url = %request.url, "response received");
    HttpResponse::status(status).body(body.to_vec()).build()
}

fn transport_failure(request: &HttpRequest, error: &dyn std::error::Error) -> HttpResponse {
    tracing::warn!(method = %request.method, url = %request.url, error = %error, "request failed");
    HttpResponse::status(TRANSPORT_FAILURE_STATUS)
        .body(error.to_string().into_bytes())
        .build()
}
