use std::panic::{AssertUnwindSafe, catch_unwind};

type Teardown = Box<dyn FnOnce() -> Result<(), String>>;

/// Ordered registry of teardown actions.
///
/// Actions run last-registered-first. A failing or panicking action is
/// logged and skipped; the rest still run.
#[derive(Default)]
pub struct DisposableBag {
    actions: Vec<Teardown>,
}

impl DisposableBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an infallible teardown action.
    pub fn add(&mut self, action: impl FnOnce() + 'static) {
        self.actions.push(Box::new(move || {
            action();
            Ok(())
        }));
    }

    /// Register a teardown action that may report an error.
    pub fn add_fallible<E: std::fmt::Display>(
        &mut self,
        action: impl FnOnce() -> Result<(), E> + 'static,
    ) {
        self.actions
            .push(Box::new(move || action().map_err(|e| e.to_string())));
    }

    /// Run every registered action in reverse order and empty the bag.
    ///
    /// Returns how many actions failed.
    pub fn dispose_all(&mut self) -> usize {
        let mut failures = 0;
        while let Some(action) = self.actions.pop() {
            match catch_unwind(AssertUnwindSafe(action)) {
                Ok(Ok(())) => {},
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!(error = %e, "Teardown action failed");
                },
                Err(payload) => {
                    failures += 1;
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    tracing::warn!(error = %message, "Teardown action panicked");
                },
            }
        }
        failures
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for DisposableBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposableBag")
            .field("pending", &self.actions.len())
            .finish()
    }
}

impl Drop for DisposableBag {
    fn drop(&mut self) {
        if !self.actions.is_empty() {
            self.dispose_all();
        }
    }
}
