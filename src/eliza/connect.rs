//! Connect protocol client for the ELIZA service

use super::envelope::{self, EnvelopeReader, StreamItem};
use super::error::{Code, RpcError, WireError};
use super::types::{
    ConverseRequest, ConverseResponse, IntroduceRequest, IntroduceResponse, SayRequest,
    SayResponse, SERVICE_PATH,
};
use super::{Conversation, ElizaService};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, Client, RequestBuilder, Response};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const STREAM_CONTENT_TYPE: &str = "application/connect+json";
const PROTOCOL_VERSION_HEADER: &str = "connect-protocol-version";
const PROTOCOL_VERSION: &str = "1";

/// Outbound frames buffered ahead of the network; one turn is ever in flight
const OUTBOUND_BUFFER: usize = 4;

/// How conversational turns reach the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConverseMode {
    /// One long-lived bidirectional `Converse` stream (needs HTTP/2)
    #[default]
    Stream,
    /// A unary `Say` call per turn
    Unary,
}

/// ELIZA client speaking the Connect protocol with the JSON codec
#[derive(Clone)]
pub struct ConnectClient {
    http: Client,
    base_url: String,
    mode: ConverseMode,
}

impl ConnectClient {
    pub fn new(
        base_url: &str,
        mode: ConverseMode,
        http2_prior_knowledge: bool,
    ) -> Result<Self, RpcError> {
        let mut builder =
            Client::builder().user_agent(concat!("eliza-tui/", env!("CARGO_PKG_VERSION")));
        if http2_prior_knowledge {
            builder = builder.http2_prior_knowledge();
        }
        let http = builder
            .build()
            .map_err(|e| RpcError::internal("failed to create HTTP client").with_cause(e))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            mode,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{SERVICE_PATH}/{method}", self.base_url)
    }

    fn streaming_request(&self, method: &str) -> RequestBuilder {
        self.http
            .post(self.url(method))
            .header(CONTENT_TYPE, STREAM_CONTENT_TYPE)
            .header(PROTOCOL_VERSION_HEADER, PROTOCOL_VERSION)
    }

    /// Unary `Say` round trip
    async fn say(&self, sentence: &str) -> Result<String, RpcError> {
        let response = self
            .http
            .post(self.url("Say"))
            .header(PROTOCOL_VERSION_HEADER, PROTOCOL_VERSION)
            .json(&SayRequest {
                sentence: sentence.to_string(),
            })
            .send()
            .await
            .map_err(|e| RpcError::transport(&e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: SayResponse = response
            .json()
            .await
            .map_err(|e| RpcError::internal("malformed response message").with_cause(e))?;
        Ok(body.sentence)
    }
}

#[async_trait]
impl ElizaService for ConnectClient {
    async fn introduce(&self, name: &str) -> Result<Vec<String>, RpcError> {
        let body = envelope::encode(&IntroduceRequest {
            name: name.to_string(),
        })?;
        let response = self
            .streaming_request("Introduce")
            .body(body)
            .send()
            .await
            .map_err(|e| RpcError::transport(&e))?;

        let mut reader = stream_reader(response).await?;
        let mut lines = Vec::new();
        loop {
            let Some(frame) = reader.next().await? else {
                return Err(missing_end_stream());
            };
            match envelope::decode::<IntroduceResponse>(&frame)? {
                StreamItem::Message(message) => lines.push(message.sentence),
                StreamItem::End => return Ok(lines),
            }
        }
    }

    async fn open_conversation(&self) -> Result<Box<dyn Conversation>, RpcError> {
        match self.mode {
            ConverseMode::Stream => {
                let (outbound, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(OUTBOUND_BUFFER);
                let request = self
                    .streaming_request("Converse")
                    .body(Body::wrap_stream(ReceiverStream::new(rx)));
                Ok(Box::new(StreamingConversation {
                    outbound,
                    request: Some(request),
                    inbound: None,
                }))
            }
            ConverseMode::Unary => Ok(Box::new(UnaryConversation {
                client: self.clone(),
            })),
        }
    }
}

/// Bidirectional `Converse` stream.
///
/// The request is sent together with the first sentence; the server answers
/// with headers only after reading it. Later turns reuse the same stream.
struct StreamingConversation {
    outbound: mpsc::Sender<Result<Bytes, std::io::Error>>,
    request: Option<RequestBuilder>,
    inbound: Option<EnvelopeReader>,
}

#[async_trait]
impl Conversation for StreamingConversation {
    async fn say(&mut self, sentence: &str) -> Result<String, RpcError> {
        let frame = envelope::encode(&ConverseRequest {
            sentence: sentence.to_string(),
        })?;
        self.outbound
            .send(Ok(frame))
            .await
            .map_err(|_| RpcError::unavailable("conversation request stream closed"))?;

        if let Some(request) = self.request.take() {
            let response = request.send().await.map_err(|e| RpcError::transport(&e))?;
            self.inbound = Some(stream_reader(response).await?);
        }
        let Some(reader) = self.inbound.as_mut() else {
            return Err(RpcError::unavailable("conversation is not open"));
        };

        let Some(frame) = reader.next().await? else {
            return Err(missing_end_stream());
        };
        match envelope::decode::<ConverseResponse>(&frame)? {
            StreamItem::Message(message) => Ok(message.sentence),
            StreamItem::End => Err(RpcError::unavailable("conversation closed by server")),
        }
    }
}

/// Conversation over unary `Say` calls
struct UnaryConversation {
    client: ConnectClient,
}

#[async_trait]
impl Conversation for UnaryConversation {
    async fn say(&mut self, sentence: &str) -> Result<String, RpcError> {
        self.client.say(sentence).await
    }
}

async fn stream_reader(response: Response) -> Result<EnvelopeReader, RpcError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    Ok(EnvelopeReader::new(response.bytes_stream().boxed()))
}

/// Prefer the Connect error body; fall back to the HTTP status
async fn error_from_response(response: Response) -> RpcError {
    let status = response.status();
    let fallback = Code::from_http_status(status.as_u16());
    match response.bytes().await {
        Ok(body) => match serde_json::from_slice::<WireError>(&body) {
            Ok(wire) if wire.code.is_some() || wire.message.is_some() => {
                wire.into_rpc_error(fallback)
            }
            _ => RpcError::from_http_status(status),
        },
        Err(_) => RpcError::from_http_status(status),
    }
}

fn missing_end_stream() -> RpcError {
    RpcError::internal("stream ended without an end-of-stream message")
}
