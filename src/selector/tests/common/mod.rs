//! Shared fixtures for the integration tests

#![allow(dead_code)]

use content_selector::security::privilege::{
    P_CONTENT_SELECTOR, P_REPOSITORY, REPOSITORY_CONTENT_SELECTOR_TYPE,
};
use content_selector::security::DEFAULT_SOURCE;
use content_selector::{
    CelLanguage, ExpressionError, InMemorySecuritySystem, InMemorySelectorConfigurationStore,
    ManagerConfig, PredicateLanguage, Privilege, Selector, SelectorCompiler, SelectorManager, User,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// CEL language that counts compilations and can be slowed down
#[derive(Default)]
pub struct CountingLanguage {
    pub compilations: AtomicUsize,
    pub delay: Option<Duration>,
}

impl CountingLanguage {
    pub fn slow(delay: Duration) -> Self {
        Self {
            compilations: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    pub fn count(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }
}

impl PredicateLanguage for CountingLanguage {
    fn compile(&self, expression: &str) -> Result<Arc<dyn Selector>, ExpressionError> {
        self.compilations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        CelLanguage.compile(expression)
    }
}

pub struct Fixture {
    pub store: Arc<InMemorySelectorConfigurationStore>,
    pub security: Arc<InMemorySecuritySystem>,
    pub language: Arc<CountingLanguage>,
    pub manager: Arc<SelectorManager>,
}

/// Started manager over in-memory collaborators, not subscribed to events
pub fn fixture() -> Fixture {
    fixture_with_language(CountingLanguage::default())
}

pub fn fixture_with_language(language: CountingLanguage) -> Fixture {
    init_tracing();

    let store = Arc::new(InMemorySelectorConfigurationStore::new());
    let security = Arc::new(InMemorySecuritySystem::new());
    let language = Arc::new(language);
    let compiler = SelectorCompiler::new(language.clone(), language.clone());

    let manager = Arc::new(SelectorManager::with_compiler(
        store.clone(),
        security.clone(),
        ManagerConfig::default(),
        compiler,
    ));
    manager.start();

    Fixture {
        store,
        security,
        language,
        manager,
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn content_selector_privilege(id: &str, repository: &str, selector: &str) -> Privilege {
    Privilege::new(id, REPOSITORY_CONTENT_SELECTOR_TYPE)
        .with_property(P_REPOSITORY, repository)
        .with_property(P_CONTENT_SELECTOR, selector)
}

/// Register and authenticate a user holding `roles`
pub fn login(security: &InMemorySecuritySystem, user_id: &str, roles: &[&str]) {
    let user = roles
        .iter()
        .fold(User::new(user_id, DEFAULT_SOURCE), |user, role| user.with_role(*role));
    security.add_user(user);
    security.set_current_user(Some(user_id));
}
