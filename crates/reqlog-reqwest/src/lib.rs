//! reqwest instrumentation for reqlog
//!
//! [`InstrumentedClient`] wraps a `reqwest::Client` and publishes a start and
//! a finish lifecycle event for every request it executes. It is a strict
//! pass-through: the request is sent unmodified, the response is handed back
//! unconsumed, and nothing in the event path can fail the call.
//!
//! Response bodies are not captured, since reading them would consume the
//! response the caller is waiting for. Request bodies are captured when the
//! body is a reusable byte buffer.
//!
//! ```no_run
//! use reqlog::ActivityLogger;
//! use reqlog_reqwest::InstrumentedClient;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let logger = ActivityLogger::new();
//! logger.start_logging()?;
//!
//! let client = InstrumentedClient::new(reqwest::Client::new(), logger.bus());
//! let response = client.get("https://api.example.com/users").await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

use reqlog::{
    error_chain, EventBus, RequestDescriptor, RequestEvent, RequestResult, ResponseSnapshot,
};

/// HTTP client wrapper that publishes request lifecycle events
///
/// Request ids are drawn from the bus, so clients cloned from this one or
/// constructed separately against the same bus never hand out the same id.
#[derive(Debug, Clone)]
pub struct InstrumentedClient {
    client: reqwest::Client,
    bus: EventBus,
}

impl InstrumentedClient {
    /// Wrap a client, publishing events to the given bus
    pub fn new(client: reqwest::Client, bus: EventBus) -> Self {
        Self { client, bus }
    }

    /// The wrapped client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Bus this client publishes to
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// Execute a GET request
    pub async fn get(&self, url: impl reqwest::IntoUrl) -> reqwest::Result<reqwest::Response> {
        let request = self.client.get(url).build()?;
        self.execute(request).await
    }

    /// Execute a POST request with the given body
    pub async fn post(
        &self,
        url: impl reqwest::IntoUrl,
        body: impl Into<reqwest::Body>,
    ) -> reqwest::Result<reqwest::Response> {
        let request = self.client.post(url).body(body).build()?;
        self.execute(request).await
    }

    /// Execute a PUT request with the given body
    pub async fn put(
        &self,
        url: impl reqwest::IntoUrl,
        body: impl Into<reqwest::Body>,
    ) -> reqwest::Result<reqwest::Response> {
        let request = self.client.put(url).body(body).build()?;
        self.execute(request).await
    }

    /// Execute a DELETE request
    pub async fn delete(&self, url: impl reqwest::IntoUrl) -> reqwest::Result<reqwest::Response> {
        let request = self.client.delete(url).build()?;
        self.execute(request).await
    }

    /// Execute an arbitrary request, publishing start and finish events
    ///
    /// With no bus subscribers the request goes straight through with no
    /// snapshot or id allocation.
    pub async fn execute(
        &self,
        request: reqwest::Request,
    ) -> reqwest::Result<reqwest::Response> {
        if self.bus.subscriber_count() == 0 {
            return self.client.execute(request).await;
        }

        let id = self.bus.allocate_id();
        self.bus.publish(RequestEvent::Started {
            id,
            request: describe(&request),
        });

        let result = self.client.execute(request).await;

        let payload = match &result {
            Ok(response) => RequestResult::Response(snapshot(response)),
            Err(error) => RequestResult::Error(error_chain(error)),
        };
        self.bus.publish(RequestEvent::Finished {
            id,
            result: payload,
        });

        result
    }
}

fn describe(request: &reqwest::Request) -> RequestDescriptor {
    let mut descriptor =
        RequestDescriptor::new(request.method().as_str(), request.url().as_str())
            .with_headers(header_pairs(request.headers()));

    let body = request
        .body()
        .and_then(|body| body.as_bytes())
        .map(<[u8]>::to_vec);
    if let Some(body) = body {
        descriptor = descriptor.with_body(body);
    }
    descriptor
}

fn snapshot(response: &reqwest::Response) -> ResponseSnapshot {
    ResponseSnapshot::new(response.status().as_u16())
        .with_headers(header_pairs(response.headers()))
}

fn header_pairs(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or("<binary>").to_string(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqlog::RequestId;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_describe_captures_request_fields() {
        let mut request = reqwest::Request::new(
            reqwest::Method::POST,
            "https://api.example.com/users".parse().unwrap(),
        );
        request
            .headers_mut()
            .insert("content-type", HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(reqwest::Body::from(r#"{"name":"ada"}"#));

        let descriptor = describe(&request);

        assert_eq!(descriptor.method, "POST");
        assert_eq!(descriptor.url, "https://api.example.com/users");
        assert_eq!(
            descriptor.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        assert_eq!(descriptor.body.as_deref(), Some(br#"{"name":"ada"}"#.as_ref()));
    }

    #[test]
    fn test_describe_without_body() {
        let request = reqwest::Request::new(
            reqwest::Method::GET,
            "https://api.example.com/users".parse().unwrap(),
        );

        let descriptor = describe(&request);

        assert_eq!(descriptor.method, "GET");
        assert!(descriptor.body.is_none());
    }

    #[tokio::test]
    async fn test_execute_without_subscribers_skips_publishing() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = InstrumentedClient::new(reqwest::Client::new(), EventBus::new());
        let response = client.get(format!("{}/ping", server.uri())).await.unwrap();

        assert_eq!(response.status().as_u16(), 204);
        // Nothing was drawn from the id sequence for the skipped request
        assert_eq!(client.bus().allocate_id(), RequestId(1));
    }

    #[tokio::test]
    async fn test_execute_publishes_start_and_finish() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let bus = EventBus::new();
        let mut events = bus.subscribe();
        let client = InstrumentedClient::new(reqwest::Client::new(), bus);

        client.get(format!("{}/users", server.uri())).await.unwrap();

        let started = events.recv().await.unwrap();
        let finished = events.recv().await.unwrap();
        assert_eq!(started.id(), finished.id());

        match started {
            RequestEvent::Started { request, .. } => {
                assert_eq!(request.method, "GET");
                assert!(request.url.ends_with("/users"));
            }
            other => panic!("expected start event, got {:?}", other),
        }
        match finished {
            RequestEvent::Finished { result, .. } => match result {
                RequestResult::Response(snapshot) => assert_eq!(snapshot.status, 200),
                RequestResult::Error(error) => panic!("expected response, got {}", error),
            },
            other => panic!("expected finish event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_separate_clients_on_one_bus_use_distinct_ids() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let bus = EventBus::new();
        let mut events = bus.subscribe();
        let first = InstrumentedClient::new(reqwest::Client::new(), bus.clone());
        let second = InstrumentedClient::new(reqwest::Client::new(), bus.clone());

        first.get(format!("{}/a", server.uri())).await.unwrap();
        second.get(format!("{}/b", server.uri())).await.unwrap();

        let mut started = Vec::new();
        for _ in 0..4 {
            if let RequestEvent::Started { id, .. } = events.recv().await.unwrap() {
                started.push(id);
            }
        }

        assert_eq!(started.len(), 2);
        assert_ne!(started[0], started[1]);
    }
}
