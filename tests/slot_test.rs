mod common;

use common::{DropLog, init_tracing};
use native_handles::{ExternalSlot, HandleError, HandleLimits, live_handles, wrap};
use pretty_assertions::assert_eq;

#[test]
fn test_host_collection_order_does_not_matter() {
    init_tracing();
    let log = DropLog::new();

    let node = wrap("node".to_string(), "rcl_node_t", log.recorder()).unwrap();
    let publisher = wrap("publisher".to_string(), "rcl_publisher_t", log.recorder()).unwrap();
    publisher.add_dependency(&node).unwrap();

    // The host finalizes the node first; the publisher still needs it.
    drop(node);
    assert!(log.entries().is_empty());

    drop(publisher);
    assert_eq!(log.entries(), vec!["publisher", "node"]);
}

#[test]
fn test_explicit_release_then_finalize() {
    let log = DropLog::new();
    let mut slot = wrap("timer".to_string(), "rcl_timer_t", log.recorder()).unwrap();

    assert!(slot.release());
    assert_eq!(log.entries(), vec!["timer"]);

    // Finalization after an explicit release does nothing.
    drop(slot);
    assert_eq!(log.count("timer"), 1);
}

#[test]
fn test_unwrap_by_name() {
    let slot = wrap(vec![0u8; 16], "rmw_buffer_t", |_| {}).unwrap();

    assert_eq!(slot.unwrap::<Vec<u8>>("rmw_buffer_t").map(Vec::len), Ok(16));

    let err = slot.unwrap::<Vec<u8>>("rcl_node_t").unwrap_err();
    assert_eq!(
        err.to_string(),
        "capsule name mismatch: expected `rcl_node_t`, found `rmw_buffer_t`"
    );
    assert_eq!(slot.handle().map(|h| h.ref_count()), Some(1));
}

#[test]
fn test_from_handle_shares_owner() {
    let log = DropLog::new();
    let handle = log.handle("client");

    let first = ExternalSlot::from_handle(handle.clone(), "rcl_client_t");
    let second = ExternalSlot::from_handle(handle, "rcl_client_t");
    assert_eq!(first.handle_id(), second.handle_id());
    assert_eq!(first.handle().map(|h| h.ref_count()), Some(2));

    drop(first);
    assert!(log.entries().is_empty());
    drop(second);
    assert_eq!(log.entries(), vec!["client"]);
}

#[test]
fn test_wrap_under_limit_leaks_nothing() {
    let baseline = live_handles();
    let log = DropLog::new();
    let _existing = log.handle("existing");

    let _limits = HandleLimits {
        max_live_handles: baseline + 1,
        max_dependencies: 0,
    }
    .install();

    let result = wrap("late".to_string(), "rcl_node_t", log.recorder());
    assert_eq!(
        result.err(),
        Some(HandleError::AllocationFailure { what: "handle" })
    );
    assert_eq!(live_handles(), baseline + 1);
    assert_eq!(log.count("late"), 0);
}
