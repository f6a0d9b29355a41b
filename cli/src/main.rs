//! scopetree demo binary.
//!
//! Shows the two root scopes are process-wide singletons, then builds a
//! scope tree, parks an async waiter on every leaf, cancels the root and
//! reports what each leaf observed.
//!
//! ```text
//! root (with_cancel_cause)
//!  └─ with_value("level", 1) ─ with_cancel ─ with_value("level", 2) ─ ...
//!                                                     └─ leaf: waiter task
//! ```

mod tree;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use scopetree_config::{DemoSettings, ScopetreeConfig};
use scopetree_core::{Scope, ScopeError, background, cause, todo, with_cancel_cause};

/// Upper bound on how long a leaf waits for the cascade to reach it.
const LEAF_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
#[error("{0}")]
struct DemoStop(String);

fn init_tracing(config: Option<&ScopetreeConfig>) {
    let configured = config.and_then(ScopetreeConfig::log_filter);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn load_config() -> (Option<ScopetreeConfig>, Option<String>) {
    match ScopetreeConfig::load() {
        Ok(config) => (config, None),
        // Tracing is not up yet; report once it is.
        Err(err) => (None, Some(err.to_string())),
    }
}

fn print_root_identities() {
    println!(
        "background: {:p}, {:p}",
        Arc::as_ptr(&background()),
        Arc::as_ptr(&background())
    );
    println!(
        "todo:       {:p}, {:p}",
        Arc::as_ptr(&todo()),
        Arc::as_ptr(&todo())
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_error) = load_config();
    init_tracing(config.as_ref());
    if let Some(err) = config_error {
        tracing::warn!("Ignoring config: {err}");
    }

    let settings = DemoSettings::resolve(config.as_ref());
    tracing::info!(
        depth = settings.depth,
        fanout = settings.fanout,
        "building scope tree"
    );

    print_root_identities();

    let (root, cancel_root) = with_cancel_cause(background());
    let leaves = tree::build(root.clone(), &settings);
    println!("built {} leaves under {}", leaves.len(), root.name());

    let mut waiters = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        let done = leaf
            .scope
            .done()
            .context("cancelable leaf has no done signal")?;
        waiters.push(tokio::spawn(async move {
            let fired = tokio::time::timeout(LEAF_WAIT, done.fired()).await.is_ok();
            (leaf, fired)
        }));
    }

    let why = ScopeError::new(DemoStop(settings.cause.clone()));
    cancel_root.cancel(why.clone());

    let mut reached = 0_usize;
    for waiter in waiters {
        let (leaf, fired) = waiter.await.context("leaf waiter panicked")?;
        let err = leaf.scope.err();
        let leaf_cause = cause(&*leaf.scope);
        let same_cause = leaf_cause.as_ref().is_some_and(|c| c.ptr_eq(&why));
        if fired && err.is_some() && same_cause {
            reached += 1;
        }
        println!(
            "{:<12} fired={fired:<5} err={} cause={} level={}",
            leaf.path,
            err.map_or_else(|| "-".to_string(), |e| e.to_string()),
            leaf_cause.map_or_else(|| "-".to_string(), |c| c.to_string()),
            leaf.level()
                .map_or_else(|| "-".to_string(), |level| level.to_string()),
        );
    }

    println!("cancellation reached {reached} leaves");
    anyhow::ensure!(root.err().is_some(), "root scope was not canceled");
    Ok(())
}
