//! Concrete stub for the record service.
//!
//! # Responsibilities
//! - Own one Credential, one Session and one Connection
//! - Log in on demand and rebuild the connection after renewal
//! - Expose query/create/update/delete, each wrapped in a RecoverableCall

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::json;

use crate::config::{ClientConfig, ConfigError, RecoveryConfig};
use crate::lifecycle::Shutdown;
use crate::net::{Connection, ConnectorConfig, RemoteFault};
use crate::resilience::{ClassifierRegistry, RecoverableCall, RecoveryError, RecoveryResult};
use crate::session::{Credential, LoginResult, Session, SessionType};
use crate::stub::login::{HttpLogin, LoginStrategy};
use crate::stub::types::{DeleteResult, QueryResult, SObject, SaveResult, StubError};
use crate::stub::Stub;

/// Session-bound client for the record service.
pub struct ServiceStub {
    credential: Credential,
    login: Arc<dyn LoginStrategy>,
    session: Session,
    connection: Option<Connection>,
    request_timeout: Option<Duration>,
    recovery: RecoveryConfig,
    registry: Arc<ClassifierRegistry>,
    shutdown: Option<Shutdown>,
}

impl ServiceStub {
    /// Create an unprepared stub. The first operation logs in.
    pub fn new(credential: Credential, session_type: SessionType, login: Arc<dyn LoginStrategy>) -> Self {
        Self {
            credential,
            login,
            session: Session::new(session_type),
            connection: None,
            request_timeout: None,
            recovery: RecoveryConfig::default(),
            registry: Arc::new(ClassifierRegistry::builtin()),
            shutdown: None,
        }
    }

    /// Build a stub that logs in over HTTP as described by `config`.
    pub fn from_config(config: &ClientConfig, credential: Credential) -> Result<Self, ConfigError> {
        let login_url = config.endpoint.login_url.clone().ok_or_else(ConfigError::missing_login_url)?;
        let timeout = Duration::from_secs(config.endpoint.request_timeout_secs);
        let login = HttpLogin::new(login_url, timeout).map_err(ConfigError::HttpClient)?;

        Ok(Self::new(credential, config.endpoint.session_type, Arc::new(login))
            .with_recovery(config.recovery.clone())
            .with_request_timeout(timeout))
    }

    pub fn with_recovery(mut self, recovery: RecoveryConfig) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_registry(mut self, registry: Arc<ClassifierRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Cancel pending backoff waits when `shutdown` triggers.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn login_result(&self) -> Option<&LoginResult> {
        self.session.login_result()
    }

    /// The bound connection, or `NotPrepared` before the first login.
    pub fn connection(&self) -> Result<&Connection, RemoteFault> {
        self.connection.as_ref().ok_or(RemoteFault::NotPrepared)
    }

    /// Wrap `operation` with this stub's retry policy, registry and shutdown signal.
    pub fn recoverable<R, F>(&self, name: &str, operation: F) -> RecoverableCall<R, Self, F>
    where
        F: for<'a> FnMut(&'a Self) -> BoxFuture<'a, Result<R, RemoteFault>>,
    {
        let call = RecoverableCall::new(name, operation)
            .with_policy(&self.recovery)
            .with_registry(self.registry.clone());
        match &self.shutdown {
            Some(shutdown) => call.with_shutdown(shutdown.subscribe()),
            None => call,
        }
    }

    async fn execute<R, F>(&mut self, name: &str, operation: F) -> RecoveryResult<R>
    where
        F: for<'a> FnMut(&'a Self) -> BoxFuture<'a, Result<R, RemoteFault>>,
    {
        self.prepare(false).await.map_err(|source| RecoveryError::Session {
            operation: name.to_string(),
            source,
        })?;
        let mut call = self.recoverable(name, operation);
        call.invoke(self).await
    }

    /// Run a query and return the first page.
    pub async fn query(&mut self, soql: &str) -> RecoveryResult<QueryResult> {
        let soql = soql.to_string();
        self.execute("Query", move |stub| {
            let params = json!({ "soql": soql });
            async move { stub.connection()?.call("query", params).await }.boxed()
        })
        .await
    }

    /// Like [`query`](Self::query), including deleted and archived records.
    pub async fn query_all(&mut self, soql: &str) -> RecoveryResult<QueryResult> {
        let soql = soql.to_string();
        self.execute("QueryAll", move |stub| {
            let params = json!({ "soql": soql });
            async move { stub.connection()?.call("queryAll", params).await }.boxed()
        })
        .await
    }

    /// Fetch the next page for a query locator.
    pub async fn query_more(&mut self, query_locator: &str) -> RecoveryResult<QueryResult> {
        let query_locator = query_locator.to_string();
        self.execute("QueryMore", move |stub| {
            let params = json!({ "queryLocator": query_locator });
            async move { stub.connection()?.call("queryMore", params).await }.boxed()
        })
        .await
    }

    pub async fn create(&mut self, objects: &[SObject]) -> RecoveryResult<Vec<SaveResult>> {
        let objects = objects.to_vec();
        self.execute("create", move |stub| {
            let params = json!({ "sObjects": objects });
            async move { stub.connection()?.call("create", params).await }.boxed()
        })
        .await
    }

    pub async fn update(&mut self, objects: &[SObject]) -> RecoveryResult<Vec<SaveResult>> {
        let objects = objects.to_vec();
        self.execute("update", move |stub| {
            let params = json!({ "sObjects": objects });
            async move { stub.connection()?.call("update", params).await }.boxed()
        })
        .await
    }

    pub async fn delete(&mut self, ids: &[String]) -> RecoveryResult<Vec<DeleteResult>> {
        let ids = ids.to_vec();
        self.execute("delete", move |stub| {
            let params = json!({ "ids": ids });
            async move { stub.connection()?.call("delete", params).await }.boxed()
        })
        .await
    }
}

impl Stub for ServiceStub {
    fn session(&self) -> &Session {
        &self.session
    }

    /// Session and connection are swapped in only once login and setup both
    /// succeed; a failed renewal leaves the previous binding in place.
    async fn prepare(&mut self, force_new: bool) -> Result<(), StubError> {
        if !force_new && self.connection.is_some() {
            return Ok(());
        }

        let result = self.login.login(&self.credential).await?;
        let mut session = self.session.clone();
        session.establish(result)?;

        let config = ConnectorConfig {
            manual_login: true,
            service_endpoint: session.server_url().cloned(),
            session_id: session.session_id().map(str::to_string),
            timeout: self.request_timeout,
        };
        let connection = Connection::new(config).map_err(|source| StubError::Setup {
            username: self.credential.username().to_string(),
            source,
        })?;

        tracing::debug!(
            username = self.credential.username(),
            connection = %connection.id(),
            endpoint = %connection.endpoint(),
            force_new,
            "Connection bound to session"
        );
        self.session = session;
        self.connection = Some(connection);
        Ok(())
    }
}

impl std::fmt::Debug for ServiceStub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStub")
            .field("credential", &self.credential)
            .field("session", &self.session)
            .field("connection", &self.connection)
            .field("recovery", &self.recovery)
            .finish()
    }
}
