//! Builds a small middleware graph and lets the "host" drop it in the wrong order.
//!
//! Run with `RUST_LOG=trace cargo run --example node_graph` to see the cascade.

use native_handles::{HandleLimits, ManagedHandle, Result, wrap};

fn entity(kind: &'static str, name: &str) -> Result<ManagedHandle> {
    let label = format!("{}:{}", kind, name);
    let slot = wrap(label, kind, |label| println!("  destroy {}", label))?;
    Ok(ManagedHandle::new(slot))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let _limits = HandleLimits::from_env().install();

    println!("=== Building graph ===");
    let context = entity("rcl_context_t", "default")?;
    let node = entity("rcl_node_t", "talker")?;
    let clock = entity("rcl_clock_t", "ros_time")?;
    let publisher = entity("rcl_publisher_t", "chatter")?;
    let timer = entity("rcl_timer_t", "tick")?;

    node.requires(&context)?;
    clock.requires(&context)?;
    publisher.requires(&node)?;
    timer.requires(&clock)?;
    timer.requires(&node)?;

    {
        let guard = timer.acquire()?;
        let label = guard.unwrap::<String>("rcl_timer_t")?;
        println!("Using {} while destroying the context", label);
        context.destroy(Some(Box::new(|h: &ManagedHandle| {
            println!("  host released {}", h.name())
        })))?;
    }

    println!("=== Host drops context, node and clock ===");
    drop(context);
    drop(node);
    drop(clock);

    println!("=== Host drops publisher ===");
    drop(publisher);

    println!("=== Host drops timer ===");
    drop(timer);

    println!(
        "=== Done: {} live handles ===",
        native_handles::live_handles()
    );

    Ok(())
}
