//! Where the tracker sends the stop events it detects.

use async_trait::async_trait;
use demurrage::{client::Client, database::Database, Caller};
use model::{
    stop_event::StopEvent,
    tracking::{ActiveStopEvent, ClosedStopEvent, EndTracking, StartTracking},
    WithId,
};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    clock::Clock,
    error::{Result, TrackerError},
};

#[async_trait]
pub trait TrackingBackend: Send + Sync + 'static {
    async fn start(&self, request: StartTracking) -> Result<WithId<StopEvent>>;
    async fn end(&self, request: EndTracking) -> Result<ClosedStopEvent>;
    async fn active(&self) -> Result<Option<ActiveStopEvent>>;
}

/// Talks to the REST interface of the web server.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    code: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        }
    }

    async fn call<T, B>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = format!("{}/api/{}", self.base_url, endpoint);
        log::debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        parse_envelope(status, &text)
    }
}

/// Unwraps the `data` of a successful answer or turns the `error` of a failed
/// one into [`TrackerError::Api`].
fn parse_envelope<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T> {
    match serde_json::from_str::<Envelope<serde_json::Value>>(text) {
        Ok(envelope) if status.is_success() && envelope.success => {
            let data = envelope.data.unwrap_or(serde_json::Value::Null);
            Ok(serde_json::from_value(data)?)
        }
        Ok(envelope) => Err(TrackerError::Api {
            status: status.as_u16(),
            code: envelope.code,
            message: envelope.error.unwrap_or_else(|| status.to_string()),
        }),
        Err(_) => Err(TrackerError::Api {
            status: status.as_u16(),
            code: None,
            message: if text.is_empty() {
                status.canonical_reason().unwrap_or("no answer").to_owned()
            } else {
                text.to_owned()
            },
        }),
    }
}

#[async_trait]
impl TrackingBackend for HttpBackend {
    async fn start(&self, request: StartTracking) -> Result<WithId<StopEvent>> {
        self.call(Method::POST, "tracking/start", Some(&request)).await
    }

    async fn end(&self, request: EndTracking) -> Result<ClosedStopEvent> {
        self.call(Method::POST, "tracking/end", Some(&request)).await
    }

    async fn active(&self) -> Result<Option<ActiveStopEvent>> {
        self.call::<_, ()>(Method::GET, "tracking/active", None).await
    }
}

/// Runs the service in process, on behalf of one authenticated user.
pub struct LocalBackend<D: Database> {
    client: Client<D>,
    caller: Caller,
    clock: Clock,
}

impl<D: Database> LocalBackend<D> {
    pub fn new(client: Client<D>, caller: Caller, clock: Clock) -> Self {
        Self {
            client,
            caller,
            clock,
        }
    }

    pub fn client(&self) -> &Client<D> {
        &self.client
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }
}

#[async_trait]
impl<D> TrackingBackend for LocalBackend<D>
where
    D: Database + Send + Sync + 'static,
{
    async fn start(&self, request: StartTracking) -> Result<WithId<StopEvent>> {
        Ok(self
            .client
            .start_tracking(&self.caller, request, self.clock.now())
            .await?)
    }

    async fn end(&self, request: EndTracking) -> Result<ClosedStopEvent> {
        Ok(self
            .client
            .end_tracking(&self.caller, request, self.clock.now())
            .await?)
    }

    async fn active(&self) -> Result<Option<ActiveStopEvent>> {
        Ok(self.client.get_active(&self.caller, self.clock.now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_is_unwrapped_from_the_envelope() {
        let active: Option<ActiveStopEvent> =
            parse_envelope(StatusCode::OK, r#"{"success":true,"data":null}"#).unwrap();
        assert!(active.is_none());
    }

    #[test]
    fn failures_keep_status_and_message() {
        let result = parse_envelope::<ClosedStopEvent>(
            StatusCode::BAD_REQUEST,
            r#"{"success":false,"error":"Tracking is already active.","code":"conflict"}"#,
        );
        let why = result.unwrap_err();
        assert!(why.is_conflict());
        assert!(matches!(
            why,
            TrackerError::Api { status: 400, ref message, .. }
                if message == "Tracking is already active."
        ));

        // only the code tells conflicts apart from other bad requests
        let why = parse_envelope::<ClosedStopEvent>(
            StatusCode::BAD_REQUEST,
            r#"{"success":false,"error":"Tracking is already active.","code":"invalid"}"#,
        )
        .unwrap_err();
        assert!(!why.is_conflict());

        let why = parse_envelope::<ClosedStopEvent>(StatusCode::NOT_FOUND, "").unwrap_err();
        assert!(why.is_not_found());
        assert!(matches!(why, TrackerError::Api { ref message, .. } if message == "Not Found"));
    }
}
