pub mod openai;
pub mod realtime;

// Re-export commonly used types for convenience
pub use openai::{OpenAIClient, OpenAIError, OpenAIResult};

pub use realtime::{
    CredentialProvider, GatewayCredentialProvider, LinkMessage, RealtimeConnector, RealtimeError,
    RealtimeLink, RealtimeResult, RealtimeStatus, RealtimeVoiceSession, WebRtcConnector,
    WebSocketConnector,
};
