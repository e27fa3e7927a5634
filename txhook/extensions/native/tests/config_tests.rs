// Configuration switches for the installer. The config store is global, so
// everything lives in a single test to keep the steps ordered.

use std::sync::Arc;

use txhook_core::config;
use txhook_core::trace::{TransactionContext, TransactionFactory};
use txhook_core::{Carrier, Hub};
use txhook_native::{install, InstallStatus, PATCH_NAME, SPAN_OP_DEFAULT};

use test_helpers::{event_log, events, RecordingObserver, StubFactory};

#[test]
fn test_config_switches() {
    let log = event_log();
    let factory = StubFactory::new(&log);
    let carrier = Arc::new(Carrier::new());
    carrier
        .extensions()
        .set_start_transaction(factory.clone() as Arc<dyn TransactionFactory>);
    let hub = Hub::new(carrier);
    hub.add_integration(RecordingObserver::new(&log));

    // disabled: registry untouched
    config::set(config::ENABLED, false);
    assert_eq!(install(&hub), InstallStatus::Disabled);
    assert!(!hub.carrier().extensions().is_patched(PATCH_NAME));

    // enabled without lifecycle: labels defaulted, observer never called
    config::set(config::ENABLED, true);
    config::set(config::LIFECYCLE, "off");
    assert_eq!(install(&hub), InstallStatus::Installed);

    let mut ctx = TransactionContext::new("screen");
    let tx = hub.start_transaction(&mut ctx, None).unwrap();
    tx.finish(None).unwrap();

    assert_eq!(ctx.op.as_deref(), Some(SPAN_OP_DEFAULT));
    assert_eq!(events(&log), vec!["factory", "finish"]);

    config::clear();
}
