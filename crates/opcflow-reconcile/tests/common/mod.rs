use async_trait::async_trait;
use opcflow_reconcile::{
    Attributes, CallContext, CreateRequest, FieldKind, FieldSpec, FieldValue, RemoteClient,
    RemoteError, ResourceDescriptor, UpdateRequest,
};
use std::collections::BTreeMap;
use std::sync::{LazyLock, Mutex};

pub static SECURITY_LIST: LazyLock<ResourceDescriptor> = LazyLock::new(|| {
    ResourceDescriptor::new(
        "security_list",
        vec![
            FieldSpec::required("name", FieldKind::String).force_new(),
            FieldSpec::optional("description", FieldKind::String),
            FieldSpec::optional("policy", FieldKind::String)
                .with_default("deny")
                .one_of(&["deny", "permit", "reject"]),
            FieldSpec::optional("outbound_cidr_policy", FieldKind::String)
                .with_default("permit")
                .one_of(&["deny", "permit", "reject"]),
            FieldSpec::computed("fqdn", FieldKind::String),
        ],
    )
});

pub static SSH_KEY: LazyLock<ResourceDescriptor> = LazyLock::new(|| {
    ResourceDescriptor::new(
        "ssh_key",
        vec![
            FieldSpec::required("name", FieldKind::String).force_new(),
            FieldSpec::required("key", FieldKind::String),
            FieldSpec::optional("enabled", FieldKind::Bool).with_default(true),
            FieldSpec::computed("fqdn", FieldKind::String),
        ],
    )
});

pub static SECURITY_APPLICATION: LazyLock<ResourceDescriptor> = LazyLock::new(|| {
    ResourceDescriptor::new(
        "security_application",
        vec![
            FieldSpec::required("name", FieldKind::String).force_new(),
            FieldSpec::required("protocol", FieldKind::String)
                .force_new()
                .one_of(&["tcp", "udp", "icmp"]),
            FieldSpec::optional("dport", FieldKind::String).force_new(),
        ],
    )
});

/// A recorded client call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(CreateRequest),
    Read(String, CallContext),
    Update(UpdateRequest),
    Delete(String),
}

/// How reads of missing objects are reported
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbsenceStyle {
    NotFoundError,
    EmptyPayload,
    NoPayload,
}

/// In-memory remote collection
pub struct MemoryClient {
    objects: Mutex<BTreeMap<String, Attributes>>,
    calls: Mutex<Vec<Call>>,
    failure: Mutex<Option<RemoteError>>,
    update_failure: Mutex<Option<RemoteError>>,
    /// Acknowledge writes without keeping the object
    drop_writes: Mutex<bool>,
    absence: AbsenceStyle,
    /// Server-side enum casing
    upper_case_enums: bool,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::with_absence(AbsenceStyle::NotFoundError)
    }

    pub fn with_absence(absence: AbsenceStyle) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            update_failure: Mutex::new(None),
            drop_writes: Mutex::new(false),
            absence,
            upper_case_enums: false,
        }
    }

    pub fn upper_case_enums(mut self) -> Self {
        self.upper_case_enums = true;
        self
    }

    /// Fail every subsequent call with `error`
    pub fn fail_with(&self, error: RemoteError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    /// Fail only update calls with `error`
    pub fn fail_updates_with(&self, error: RemoteError) {
        *self.update_failure.lock().unwrap() = Some(error);
    }

    /// Accept writes but lose the object, so the next read misses it
    pub fn drop_writes(&self) {
        *self.drop_writes.lock().unwrap() = true;
    }

    /// Remove an object behind the engine's back
    pub fn delete_out_of_band(&self, name: &str) {
        self.objects.lock().unwrap().remove(name);
    }

    pub fn object(&self, name: &str) -> Option<Attributes> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn observed(&self, name: &str, fields: &Attributes) -> Attributes {
        let mut observed: Attributes = fields
            .iter()
            .map(|(k, v)| {
                let v = match (self.upper_case_enums, k.as_str(), v) {
                    (true, "policy" | "outbound_cidr_policy", FieldValue::String(s)) => {
                        FieldValue::String(s.to_uppercase())
                    }
                    _ => v.clone(),
                };
                (k.clone(), v)
            })
            .collect();
        observed.insert("name".to_string(), FieldValue::from(name));
        observed.insert(
            "fqdn".to_string(),
            FieldValue::from(format!("/Compute-acme/jo/{}", name)),
        );
        observed
    }
}

#[async_trait]
impl RemoteClient for MemoryClient {
    async fn create(
        &self,
        _ctx: &CallContext,
        request: &CreateRequest,
    ) -> Result<Attributes, RemoteError> {
        self.record(Call::Create(request.clone()))?;
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&request.identity) {
            return Err(RemoteError::Api {
                status: 409,
                message: format!("{} already exists", request.identity),
            });
        }
        let observed = self.observed(&request.identity, &request.fields);
        if !*self.drop_writes.lock().unwrap() {
            objects.insert(request.identity.clone(), observed.clone());
        }
        Ok(observed)
    }

    async fn read(
        &self,
        ctx: &CallContext,
        identity: &str,
    ) -> Result<Option<Attributes>, RemoteError> {
        self.record(Call::Read(identity.to_string(), ctx.clone()))?;
        match self.objects.lock().unwrap().get(identity) {
            Some(object) => Ok(Some(object.clone())),
            None => match self.absence {
                AbsenceStyle::NotFoundError => Err(RemoteError::NotFound(identity.to_string())),
                AbsenceStyle::EmptyPayload => Ok(Some(Attributes::new())),
                AbsenceStyle::NoPayload => Ok(None),
            },
        }
    }

    async fn update(
        &self,
        _ctx: &CallContext,
        request: &UpdateRequest,
    ) -> Result<Attributes, RemoteError> {
        self.record(Call::Update(request.clone()))?;
        if let Some(error) = self.update_failure.lock().unwrap().clone() {
            return Err(error);
        }
        let mut objects = self.objects.lock().unwrap();
        let Some(existing) = objects.get(&request.identity).cloned() else {
            return Err(RemoteError::NotFound(request.identity.clone()));
        };
        let mut merged = existing;
        merged.extend(self.observed(&request.identity, &request.fields));
        if *self.drop_writes.lock().unwrap() {
            objects.remove(&request.identity);
        } else {
            objects.insert(request.identity.clone(), merged.clone());
        }
        Ok(merged)
    }

    async fn delete(&self, _ctx: &CallContext, identity: &str) -> Result<(), RemoteError> {
        self.record(Call::Delete(identity.to_string()))?;
        match self.objects.lock().unwrap().remove(identity) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound(identity.to_string())),
        }
    }
}
