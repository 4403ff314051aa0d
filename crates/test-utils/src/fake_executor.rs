use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use outset::exec::{UnitExecutor, UnitStatus};
use outset::registry::Unit;

/// A fake executor that:
/// - records the file name of every unit it is asked to run
/// - reports `Failed { code: Some(1) }` for names registered as failing
/// - optionally sleeps per unit, to keep a batch in flight.
///
/// Clones share the recorded list.
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    executed: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self, name: &str) -> Self {
        self.failing.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.executed.lock().unwrap().clear();
    }
}

impl UnitExecutor for FakeExecutor {
    fn execute<'a>(
        &'a self,
        unit: &'a Unit,
    ) -> Pin<Box<dyn Future<Output = UnitStatus> + Send + 'a>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let name = unit.file_name();
            self.executed.lock().unwrap().push(name.clone());

            if self.failing.lock().unwrap().contains(&name) {
                UnitStatus::Failed { code: Some(1) }
            } else {
                UnitStatus::Succeeded
            }
        })
    }
}
