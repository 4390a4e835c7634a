//! Wire messages of `connectrpc.eliza.v1.ElizaService` (proto3 JSON mapping)

use serde::{Deserialize, Serialize};

pub const SERVICE_PATH: &str = "connectrpc.eliza.v1.ElizaService";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntroduceRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntroduceResponse {
    #[serde(default)]
    pub sentence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SayRequest {
    pub sentence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SayResponse {
    #[serde(default)]
    pub sentence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConverseRequest {
    pub sentence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConverseResponse {
    #[serde(default)]
    pub sentence: String,
}
