//! Protocol-neutral event and decision types, and their mapping to the
//! ext_proc v3 wire messages.

use envoy_types::pb::envoy::config::core::v3::HeaderMap;
use envoy_types::pb::envoy::service::ext_proc::v3::{
    body_mutation::Mutation, common_response::ResponseStatus, processing_request,
    processing_response, BodyMutation, BodyResponse, CommonResponse, HeadersResponse,
    ProcessingRequest, ProcessingResponse, TrailersResponse,
};

/// One header as received from the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub raw_value: Vec<u8>,
}

/// Ordered request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet(Vec<Header>);

impl HeaderSet {
    pub fn new(headers: Vec<Header>) -> Self {
        Self(headers)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| Header {
                    key: key.into(),
                    raw_value: value.into(),
                })
                .collect(),
        )
    }
}

impl From<Option<HeaderMap>> for HeaderSet {
    fn from(map: Option<HeaderMap>) -> Self {
        let headers = map.map(|m| m.headers).unwrap_or_default();
        Self(
            headers
                .into_iter()
                .map(|h| {
                    let raw_value: Vec<u8> = h.raw_value.into();
                    // Older proxies only populate the string field.
                    let raw_value = if raw_value.is_empty() {
                        h.value.into_bytes()
                    } else {
                        raw_value
                    };
                    Header {
                        key: h.key,
                        raw_value,
                    }
                })
                .collect(),
        )
    }
}

/// Phase of the HTTP transaction an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    RequestHeaders,
    RequestBody,
    RequestTrailers,
    ResponseHeaders,
    ResponseBody,
    ResponseTrailers,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::RequestHeaders => "request_headers",
            Phase::RequestBody => "request_body",
            Phase::RequestTrailers => "request_trailers",
            Phase::ResponseHeaders => "response_headers",
            Phase::ResponseBody => "response_body",
            Phase::ResponseTrailers => "response_trailers",
        }
    }
}

/// One message received from the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingEvent {
    RequestHeaders(HeaderSet),
    RequestBody,
    RequestTrailers,
    ResponseHeaders,
    ResponseBody,
    ResponseTrailers,
    /// No variant set, or one this build does not know.
    Unset,
}

impl ProcessingEvent {
    pub fn phase(&self) -> Option<Phase> {
        match self {
            ProcessingEvent::RequestHeaders(_) => Some(Phase::RequestHeaders),
            ProcessingEvent::RequestBody => Some(Phase::RequestBody),
            ProcessingEvent::RequestTrailers => Some(Phase::RequestTrailers),
            ProcessingEvent::ResponseHeaders => Some(Phase::ResponseHeaders),
            ProcessingEvent::ResponseBody => Some(Phase::ResponseBody),
            ProcessingEvent::ResponseTrailers => Some(Phase::ResponseTrailers),
            ProcessingEvent::Unset => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.phase().map(|p| p.as_str()).unwrap_or("unset")
    }
}

impl From<ProcessingRequest> for ProcessingEvent {
    #[allow(unreachable_patterns)]
    fn from(request: ProcessingRequest) -> Self {
        use processing_request::Request;

        match request.request {
            Some(Request::RequestHeaders(headers)) => {
                ProcessingEvent::RequestHeaders(HeaderSet::from(headers.headers))
            }
            Some(Request::RequestBody(_)) => ProcessingEvent::RequestBody,
            Some(Request::RequestTrailers(_)) => ProcessingEvent::RequestTrailers,
            Some(Request::ResponseHeaders(_)) => ProcessingEvent::ResponseHeaders,
            Some(Request::ResponseBody(_)) => ProcessingEvent::ResponseBody,
            Some(Request::ResponseTrailers(_)) => ProcessingEvent::ResponseTrailers,
            _ => ProcessingEvent::Unset,
        }
    }
}

/// The reply to exactly one `ProcessingEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingDecision {
    /// No mutation. Carries the phase being answered, if known.
    Empty(Option<Phase>),
    /// Continue with the request body replaced by `body`.
    ContinueAndReplace { body: Vec<u8> },
}

impl ProcessingDecision {
    /// Passthrough reply for a request-headers event.
    pub fn passthrough() -> Self {
        ProcessingDecision::Empty(Some(Phase::RequestHeaders))
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, ProcessingDecision::ContinueAndReplace { .. })
    }
}

fn empty_response(phase: Phase) -> processing_response::Response {
    use processing_response::Response;

    match phase {
        Phase::RequestHeaders => Response::RequestHeaders(HeadersResponse::default()),
        Phase::RequestBody => Response::RequestBody(BodyResponse::default()),
        Phase::RequestTrailers => Response::RequestTrailers(TrailersResponse::default()),
        Phase::ResponseHeaders => Response::ResponseHeaders(HeadersResponse::default()),
        Phase::ResponseBody => Response::ResponseBody(BodyResponse::default()),
        Phase::ResponseTrailers => Response::ResponseTrailers(TrailersResponse::default()),
    }
}

impl From<ProcessingDecision> for ProcessingResponse {
    fn from(decision: ProcessingDecision) -> Self {
        let response = match decision {
            ProcessingDecision::Empty(phase) => phase.map(empty_response),
            ProcessingDecision::ContinueAndReplace { body } => Some(
                processing_response::Response::RequestHeaders(HeadersResponse {
                    response: Some(CommonResponse {
                        status: ResponseStatus::ContinueAndReplace as i32,
                        body_mutation: Some(BodyMutation {
                            mutation: Some(Mutation::Body(body.into())),
                        }),
                        ..Default::default()
                    }),
                }),
            ),
        };

        ProcessingResponse {
            response,
            ..Default::default()
        }
    }
}
