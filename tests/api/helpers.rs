use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, Method, Response};

use waitlist::configuration::{self, Environment, Settings};
use waitlist::domain::{EmailSubscription, SubscriberEmail};
use waitlist::startup::Application;
use waitlist::store::{InMemoryStore, SharedStore, StoreError, StoreStatus, SubscriptionStore};
use waitlist::telemetry;

pub static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            telemetry::get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        telemetry::initialize_subscriber(subscriber).expect("Failed to initialise tracing");
    } else {
        let subscriber =
            telemetry::get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        telemetry::initialize_subscriber(subscriber).expect("Failed to initialise tracing");
    };
});

pub const ALLOWED_ORIGIN: &str = "http://localhost:5173";

pub struct App {
    pub address: SocketAddr,
    pub client: Client,
    pub store: Arc<InMemoryStore>,
}

impl App {
    pub async fn new() -> Self {
        App::spawn(|_| {}, |store| store as SharedStore).await
    }

    pub async fn in_production() -> Self {
        App::spawn(
            |configuration| configuration.application.environment = Environment::Production,
            |store| store as SharedStore,
        )
        .await
    }

    /// `configure` adjusts the settings read from `configuration.yaml`;
    /// `wrap_store` decides what the server sees in front of the in-memory store.
    pub async fn spawn(
        configure: impl FnOnce(&mut Settings),
        wrap_store: impl FnOnce(Arc<InMemoryStore>) -> SharedStore,
    ) -> Self {
        Lazy::force(&TRACING);

        let mut configuration =
            configuration::get_configuration().expect("Failed to read configuration");
        configuration.application.host = Ipv4Addr::LOCALHOST.to_string();
        configuration.application.port = 0;
        configuration.application.environment = Environment::Development;
        configure(&mut configuration);

        let store = Arc::new(InMemoryStore::new());
        let application = Application::build_with_store(configuration, wrap_store(store.clone()))
            .await
            .expect("Failed to build the test application");
        let address = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, application.port()));

        tokio::spawn(application.run_until_stopped());

        App {
            address,
            client: Client::new(),
            store,
        }
    }
}

impl App {
    pub fn build_request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("http://{}{}", self.address, path))
    }

    pub async fn get(&self, path: &str) -> Response {
        self.build_request(Method::GET, path)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_health_check(&self) -> Response {
        self.get("/api/health").await
    }

    pub async fn get_email_count(&self) -> Response {
        self.get("/api/emails/count").await
    }

    pub async fn post_emails(&self, body: &serde_json::Value) -> Response {
        self.build_request(Method::POST, "/api/emails")
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_email(&self, email: &str) -> Response {
        self.post_emails(&serde_json::json!({ "email": email })).await
    }

    pub async fn stored_count(&self) -> u64 {
        self.store.count().await.expect("Failed to count stored emails")
    }
}

/// Never finds an existing record, as if a concurrent request inserted the
/// same email between the lookup and the write.
pub struct LookupMissesStore(pub Arc<InMemoryStore>);

#[async_trait]
impl SubscriptionStore for LookupMissesStore {
    async fn find_by_email(
        &self,
        _email: &SubscriberEmail,
    ) -> Result<Option<EmailSubscription>, StoreError> {
        Ok(None)
    }

    async fn insert(&self, subscription: &EmailSubscription) -> Result<(), StoreError> {
        self.0.insert(subscription).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.0.count().await
    }

    async fn status(&self) -> StoreStatus {
        self.0.status().await
    }
}

/// Rejects every write the way a database constraint would.
pub struct RejectingStore(pub Arc<InMemoryStore>);

#[async_trait]
impl SubscriptionStore for RejectingStore {
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<EmailSubscription>, StoreError> {
        self.0.find_by_email(email).await
    }

    async fn insert(&self, _subscription: &EmailSubscription) -> Result<(), StoreError> {
        Err(StoreError::Rejected(
            "new row violates check constraint \"emails_email_format\"".into(),
        ))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.0.count().await
    }

    async fn status(&self) -> StoreStatus {
        self.0.status().await
    }
}

/// Panics while counting.
pub struct PanickingStore(pub Arc<InMemoryStore>);

#[async_trait]
impl SubscriptionStore for PanickingStore {
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<EmailSubscription>, StoreError> {
        self.0.find_by_email(email).await
    }

    async fn insert(&self, subscription: &EmailSubscription) -> Result<(), StoreError> {
        self.0.insert(subscription).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        panic!("count exploded")
    }

    async fn status(&self) -> StoreStatus {
        self.0.status().await
    }
}
