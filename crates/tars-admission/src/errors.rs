use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdmissionError>;

/// Every error produced while judging a request. The `Display` text is
/// the message returned to the cluster API server.
#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("{0} informer has not finished syncing")]
    CacheNotSynced(String),

    #[error("{kind} {namespace}/{name} not exists")]
    ResourceNotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("get {kind} {namespace}/{name} error: {reason}")]
    ResourceGet {
        kind: String,
        namespace: String,
        name: String,
        reason: String,
    },

    #[error("{kind} resource is invalid : {reason}")]
    ResourceInvalid { kind: String, reason: String },

    #[error("{kind} resource filed \"{field}\" is immutable")]
    FieldImmutable { kind: String, field: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("unsupported {engine} {operation} {version}.{kind}")]
    Unsupported {
        engine: &'static str,
        operation: String,
        version: String,
        kind: String,
    },

    #[error("unsupported {engine} {group_version}.{kind}")]
    UnsupportedGroupVersion {
        engine: &'static str,
        group_version: String,
        kind: String,
    },

    #[error("request carries no {0}")]
    MissingObject(&'static str),

    #[error("cannot decode {kind}: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot build patch: {0}")]
    Patch(#[from] json_patch::PatchError),

    #[error("cannot hash password: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

impl AdmissionError {
    /// Rejections caused by the local caches lagging behind the cluster,
    /// as opposed to a policy violation.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, AdmissionError::CacheNotSynced(_))
    }

    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::CacheNotSynced(_) => "NotReady",
            AdmissionError::Unsupported { .. } | AdmissionError::UnsupportedGroupVersion { .. } => {
                "Unsupported"
            }
            AdmissionError::ResourceNotFound { .. } => "NotFound",
            AdmissionError::Decode { .. } | AdmissionError::MissingObject(_) => "BadRequest",
            AdmissionError::Patch(_) | AdmissionError::PasswordHash(_) => "InternalError",
            _ => "Forbidden",
        }
    }

    pub(crate) fn invalid(kind: &str, reason: impl Into<String>) -> Self {
        AdmissionError::ResourceInvalid {
            kind: kind.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn immutable(kind: &str, field: &str) -> Self {
        AdmissionError::FieldImmutable {
            kind: kind.to_owned(),
            field: field.to_owned(),
        }
    }

    pub(crate) fn not_found(kind: &str, namespace: &str, name: &str) -> Self {
        AdmissionError::ResourceNotFound {
            kind: kind.to_owned(),
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        }
    }
}
