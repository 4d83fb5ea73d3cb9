// Each test binary compiles this module and uses a different subset of it.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use eliminar_cuenta_lambda::{
    identity::{IdentityDeleter, IdentityDeletionReply},
    request::InvocationEvent,
    response::ApiResponse,
    store::{AccountStore, AuditDetail, CentralPurge, UserId, AUDIT_ACTION, AUDIT_MODULE},
    AppContext, AppError,
};
use serde_json::Value;

pub const TENANT: &str = "conjunto_alameda";
pub const DOCUMENTO: &str = "1020304050";
pub const PROYECTO_NIT: &str = "900123456";

/// Ordered record of which port was called, shared by both fakes.
pub type Journal = Arc<Mutex<Vec<&'static str>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub database: String,
    pub usuario_documento: String,
    pub responsable: String,
    pub modulo: String,
    pub accion: String,
    pub detalles: String,
}

#[derive(Default)]
pub struct StoreState {
    /// database -> documento -> id
    pub usuarios: HashMap<String, HashMap<String, UserId>>,
    pub bitacora: Vec<AuditRow>,
    /// (documento, proyecto_nit)
    pub usuarios_sistema: Vec<(String, String)>,
    /// (usuario_documento, proyecto_nit)
    pub notificaciones: Vec<(String, String)>,
    pub failing_database: Option<String>,
}

/// In-memory stand-in for the tenant and central databases.
pub struct FakeStore {
    central_database: String,
    journal: Journal,
    pub state: Mutex<StoreState>,
}

impl FakeStore {
    fn fault(&self, database: &str) -> Option<AppError> {
        let state = self.state.lock().unwrap();
        (state.failing_database.as_deref() == Some(database)).then(|| AppError::Database {
            database: database.to_owned(),
            source: sqlx::Error::Protocol("connection reset by peer".into()),
        })
    }
}

#[async_trait]
impl AccountStore for FakeStore {
    async fn record_tenant_deletion(
        &self,
        tenant_database: &str,
        documento: &str,
    ) -> Result<Option<UserId>, AppError> {
        self.journal.lock().unwrap().push("tenant");
        if let Some(err) = self.fault(tenant_database) {
            return Err(err);
        }

        let mut state = self.state.lock().unwrap();
        let Some(user_id) = state
            .usuarios
            .get(tenant_database)
            .and_then(|users| users.get(documento))
            .cloned()
        else {
            return Ok(None);
        };
        state.bitacora.push(AuditRow {
            database: tenant_database.to_owned(),
            usuario_documento: documento.to_owned(),
            responsable: documento.to_owned(),
            modulo: AUDIT_MODULE.to_owned(),
            accion: AUDIT_ACTION.to_owned(),
            detalles: AuditDetail::voluntary(&user_id).to_json()?,
        });
        Ok(Some(user_id))
    }

    async fn purge_central_account(
        &self,
        documento: &str,
        proyecto_nit: &str,
    ) -> Result<CentralPurge, AppError> {
        self.journal.lock().unwrap().push("central");
        if let Some(err) = self.fault(&self.central_database) {
            return Err(err);
        }

        let mut state = self.state.lock().unwrap();
        let matches = |row: &(String, String)| row.0 == documento && row.1 == proyecto_nit;
        let accounts_before = state.usuarios_sistema.len();
        state.usuarios_sistema.retain(|row| !matches(row));
        let notifications_before = state.notificaciones.len();
        state.notificaciones.retain(|row| !matches(row));
        Ok(CentralPurge {
            accounts: (accounts_before - state.usuarios_sistema.len()) as u64,
            notifications: (notifications_before - state.notificaciones.len()) as u64,
        })
    }
}

pub enum IdentityBehaviour {
    Reply(IdentityDeletionReply),
    TransportFailure(String),
}

/// Stand-in for the identity-deletion Lambda.
pub struct FakeIdentity {
    journal: Journal,
    pub behaviour: Mutex<IdentityBehaviour>,
    pub invocations: Mutex<Vec<String>>,
}

#[async_trait]
impl IdentityDeleter for FakeIdentity {
    async fn delete_identity(&self, documento: &str) -> Result<IdentityDeletionReply, AppError> {
        self.journal.lock().unwrap().push("identity");
        self.invocations.lock().unwrap().push(documento.to_owned());
        match &*self.behaviour.lock().unwrap() {
            IdentityBehaviour::Reply(reply) => Ok(reply.clone()),
            IdentityBehaviour::TransportFailure(message) => {
                Err(AppError::Invocation(message.clone()))
            }
        }
    }
}

pub struct TestSetup {
    pub ctx: AppContext,
    pub store: Arc<FakeStore>,
    pub identity: Arc<FakeIdentity>,
    pub journal: Journal,
}

impl TestSetup {
    /// One tenant user with a central account and two notifications; the
    /// identity function replies with success.
    pub fn seeded() -> Self {
        let journal = Journal::default();

        let mut state = StoreState::default();
        state.usuarios.insert(
            TENANT.to_owned(),
            HashMap::from([(DOCUMENTO.to_owned(), UserId::Signed(7))]),
        );
        state
            .usuarios_sistema
            .push((DOCUMENTO.to_owned(), PROYECTO_NIT.to_owned()));
        state
            .usuarios_sistema
            .push((DOCUMENTO.to_owned(), "800999111".to_owned()));
        state
            .notificaciones
            .push((DOCUMENTO.to_owned(), PROYECTO_NIT.to_owned()));
        state
            .notificaciones
            .push((DOCUMENTO.to_owned(), PROYECTO_NIT.to_owned()));
        state
            .notificaciones
            .push(("5566778899".to_owned(), PROYECTO_NIT.to_owned()));

        let store = Arc::new(FakeStore {
            central_database: "sisco_central".to_owned(),
            journal: journal.clone(),
            state: Mutex::new(state),
        });
        let identity = Arc::new(FakeIdentity {
            journal: journal.clone(),
            behaviour: Mutex::new(IdentityBehaviour::Reply(
                IdentityDeletionReply::succeeded_reply(),
            )),
            invocations: Mutex::new(Vec::new()),
        });
        let ctx = AppContext::new(store.clone(), identity.clone());

        Self {
            ctx,
            store,
            identity,
            journal,
        }
    }

    pub fn identity_replies(&self, behaviour: IdentityBehaviour) {
        *self.identity.behaviour.lock().unwrap() = behaviour;
    }

    pub fn fail_database(&self, database: &str) {
        self.store.state.lock().unwrap().failing_database = Some(database.to_owned());
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.journal.lock().unwrap().clone()
    }
}

pub fn request_body() -> Value {
    serde_json::json!({
        "user_context": {
            "copropiedad": TENANT,
            "documento": DOCUMENTO,
            "proyecto_nit": PROYECTO_NIT
        }
    })
}

pub fn event(body: Value) -> InvocationEvent {
    InvocationEvent { body: Some(body) }
}

pub fn body_json(response: &ApiResponse) -> Value {
    serde_json::from_str(&response.body).expect("response body is JSON")
}
