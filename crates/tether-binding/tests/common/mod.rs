//! Shared test doubles for the binding integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tether_binding::{
    CallError, CallFailure, DECLARED_OPERATIONS, HELLO, LoadError, ModuleManifest, ModuleSource,
    NativeExports, OperationDescriptor,
};

/// What a [`CountingSource`] hands back when opened.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A module that honors every declaration and says `reply`.
    Honoring { reply: Result<String, CallFailure> },
    /// A module whose manifest is given verbatim.
    Manifest(ModuleManifest),
    /// A load failure.
    Fail(LoadError),
    /// A source that panics while opening.
    Panic(&'static str),
}

/// A module source that counts how many times it is opened.
#[derive(Debug)]
pub struct CountingSource {
    opens: Arc<AtomicUsize>,
    outcome: Outcome,
    delay: Duration,
}

#[allow(dead_code)]
impl CountingSource {
    /// A source whose module replies `reply` to `hello`.
    pub fn replying(reply: &str) -> Self {
        Self::new(Outcome::Honoring {
            reply: Ok(reply.to_owned()),
        })
    }

    /// A source whose module answers every `hello` with `failure`.
    pub fn failing_calls(failure: CallFailure) -> Self {
        Self::new(Outcome::Honoring {
            reply: Err(failure),
        })
    }

    /// A source that always fails to load.
    pub fn failing(error: LoadError) -> Self {
        Self::new(Outcome::Fail(error))
    }

    /// A source that panics with `message` while opening.
    pub fn panicking(message: &'static str) -> Self {
        Self::new(Outcome::Panic(message))
    }

    /// A source whose module advertises `manifest`.
    pub fn with_manifest(manifest: ModuleManifest) -> Self {
        Self::new(Outcome::Manifest(manifest))
    }

    fn new(outcome: Outcome) -> Self {
        Self {
            opens: Arc::new(AtomicUsize::new(0)),
            outcome,
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long inside `open` to widen the race window.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared handle to the open counter.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.opens)
    }
}

/// The manifest a correct native module would advertise.
pub fn honoring_manifest() -> ModuleManifest {
    ModuleManifest::new(
        "counting double",
        "0.0.0",
        DECLARED_OPERATIONS
            .iter()
            .map(OperationDescriptor::from)
            .collect(),
    )
}

impl ModuleSource for CountingSource {
    type Module = FakeModule;

    fn describe(&self) -> String {
        "counting double".to_owned()
    }

    fn open(&self) -> Result<FakeModule, LoadError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        match &self.outcome {
            Outcome::Honoring { reply } => Ok(FakeModule {
                manifest: honoring_manifest(),
                reply: reply.clone(),
                calls: AtomicUsize::new(0),
            }),
            Outcome::Manifest(manifest) => Ok(FakeModule {
                manifest: manifest.clone(),
                reply: Ok(String::new()),
                calls: AtomicUsize::new(0),
            }),
            Outcome::Fail(error) => Err(error.clone()),
            Outcome::Panic(message) => panic!("{message}"),
        }
    }
}

/// In-memory stand-in for a loaded library.
#[derive(Debug)]
pub struct FakeModule {
    manifest: ModuleManifest,
    reply: Result<String, CallFailure>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeModule {
    /// Number of `hello` calls served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NativeExports for FakeModule {
    fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    fn hello(&self) -> Result<String, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .map_err(|failure| CallError::new(HELLO.name, failure))
    }
}
