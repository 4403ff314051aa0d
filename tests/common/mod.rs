#![allow(dead_code)]

use std::error::Error;
use std::sync::Arc;

use outset::exec::UnitExecutor;
use outset::fs::mock::MockFileSystem;
use outset::ledger::MemoryLedger;
use outset::registry::DirectoryRegistry;
use outset::scheduler::Scheduler;
use outset::types::PrivilegeContext;

pub use outset_test_utils::builders::{ConfigFileBuilder, QueueDir};
pub use outset_test_utils::fake_executor::FakeExecutor;
pub use outset_test_utils::fake_registrar::FakeRegistrar;
pub use outset_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Queue root used by every mock filesystem test.
pub const ROOT: &str = "/q";

/// Scheduler over `fs` rooted at [`ROOT`], with an in-memory ledger.
pub fn mock_scheduler(
    fs: &MockFileSystem,
    context: PrivilegeContext,
    executor: &FakeExecutor,
) -> Scheduler {
    let registry = DirectoryRegistry::new(ROOT, Arc::new(fs.clone()));
    let executor: Arc<dyn UnitExecutor> = Arc::new(executor.clone());
    Scheduler::new(context, registry, Box::new(MemoryLedger::new()), executor)
}

/// `/q/<category>/<name>`.
pub fn unit_path(category: outset::registry::Category, name: &str) -> String {
    format!("{ROOT}/{}/{name}", category.name())
}
