// tests/property_ordering.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use outset::engine::{CoreCommand, RuntimeEvent, RuntimeOptions, ServiceCore};
use outset::fs::mock::MockFileSystem;
use outset::registry::{Category, DirectoryRegistry};
use outset::service::Dispatcher;
use outset::types::{PrivilegeContext, SignalKind, Trigger};

// Visible unit names: no leading dot, no path separators.
fn unit_names() -> impl Strategy<Value = BTreeSet<String>> {
    proptest::collection::btree_set("[0-9A-Za-z][0-9A-Za-z_.-]{0,11}", 1..12)
}

fn batches(commands: &[CoreCommand]) -> usize {
    commands
        .iter()
        .filter(|c| matches!(c, CoreCommand::RunBatch(_)))
        .count()
}

proptest! {
    #[test]
    fn units_come_back_in_byte_order_whatever_the_creation_order(
        names in unit_names(),
        seed in any::<u64>(),
    ) {
        // Insert in a scrambled order derived from the seed.
        let mut shuffled: Vec<String> = names.iter().cloned().collect();
        let len = shuffled.len();
        for i in 0..len {
            let j = ((seed.wrapping_mul(6364136223846793005).wrapping_add(i as u64)) % len as u64) as usize;
            shuffled.swap(i, j);
        }

        let fs = MockFileSystem::new();
        for name in shuffled.iter() {
            fs.add_executable(format!("/q/boot-every/{name}"), name.as_bytes().to_vec());
        }

        let registry = DirectoryRegistry::new("/q", Arc::new(fs));
        let listed: Vec<String> = registry
            .units_in(Category::BootEvery)
            .unwrap()
            .iter()
            .map(|u| u.file_name())
            .collect();

        let expected: Vec<String> = names.into_iter().collect();
        prop_assert_eq!(listed, expected);
    }

    #[test]
    fn any_burst_of_signals_during_a_run_yields_one_follow_up(burst in 1usize..50) {
        let mut core = ServiceCore::new(
            Dispatcher::new(PrivilegeContext::User),
            RuntimeOptions::default(),
        );
        let signal = RuntimeEvent::Triggered(Trigger::Signal(SignalKind::OnDemand));

        prop_assert_eq!(batches(&core.step(signal.clone()).commands), 1);
        for _ in 0..burst {
            prop_assert_eq!(batches(&core.step(signal.clone()).commands), 0);
        }

        prop_assert_eq!(batches(&core.step(RuntimeEvent::BatchFinished).commands), 1);
        prop_assert_eq!(batches(&core.step(RuntimeEvent::BatchFinished).commands), 0);
        prop_assert!(core.is_idle());
    }
}
