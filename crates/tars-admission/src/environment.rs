use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;

use crate::cache::ResourceCache;
use crate::constants::{KUBERNETES_SYSTEM_ACCOUNT_PREFIX, UNLAWFUL_AND_ONLY_FOR_DEBUG_USERNAME};
use crate::translator::Translator;

/// The account the reconciliation controller runs as.
#[derive(Clone, Debug)]
pub struct ControllerIdentity {
    username: String,
}

impl ControllerIdentity {
    pub fn new(username: impl Into<String>) -> Self {
        ControllerIdentity {
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn authorizes(&self, username: &str) -> bool {
        self.username == username || self.username == UNLAWFUL_AND_ONLY_FOR_DEBUG_USERNAME
    }

    /// The controller itself, or one of the kube-system service accounts
    /// (garbage collector, namespace controller...).
    pub fn authorizes_or_system(&self, username: &str) -> bool {
        self.authorizes(username) || username.starts_with(KUBERNETES_SYSTEM_ACCOUNT_PREFIX)
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Everything the engines need besides the request itself. Shared by all
/// the in-flight requests.
pub struct AdmissionEnvironment {
    pub cache: Arc<dyn ResourceCache>,
    pub translator: Arc<dyn Translator>,
    pub controller: ControllerIdentity,
    pub clock: Arc<dyn Clock>,
}

impl AdmissionEnvironment {
    /// Current time formatted the way metav1.Time is serialized.
    pub fn now_rfc3339(&self) -> String {
        self.clock.now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}
