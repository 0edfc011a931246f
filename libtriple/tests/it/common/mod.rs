use std::sync::{Arc, Once};

use libtriple::{
    ClientConfig, JsonExceptionRegistry, ProstCodec, TokioExecutor, UnaryClient,
    exception::JSON_SERIALIZATION,
};
use tracing_subscriber::EnvFilter;

/// Service exception type registered with the test registry
pub const VALIDATION_EXCEPTION: &str = "com.example.ValidationException";

#[derive(Clone, PartialEq, prost::Message)]
pub struct Item {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint32, tag = "2")]
    pub count: u32,
}

static INIT: Once = Once::new();

/// Install a fmt subscriber once per test binary
pub fn init_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A client on the current runtime using JSON exception payloads
pub fn item_client() -> UnaryClient<ProstCodec<Item>> {
    let registry = Arc::new(JsonExceptionRegistry::new());
    registry.register(VALIDATION_EXCEPTION);
    let config = ClientConfig {
        serialization: JSON_SERIALIZATION.to_owned(),
        service: "com.example.ItemService".to_owned(),
        ..ClientConfig::default()
    };
    UnaryClient::new(
        config,
        ProstCodec::new(),
        registry,
        Arc::new(TokioExecutor::current().unwrap()),
    )
}
