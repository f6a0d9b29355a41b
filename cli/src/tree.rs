//! Demo tree construction.

use std::sync::Arc;

use scopetree_config::DemoSettings;
use scopetree_core::{CancelScope, value_of, with_cancel, with_value};

/// Key under which each level records its depth.
pub const LEVEL_KEY: &str = "level";

pub struct Leaf {
    pub path: String,
    pub scope: Arc<CancelScope>,
}

impl Leaf {
    /// Depth recorded by the nearest value layer above the leaf.
    pub fn level(&self) -> Option<usize> {
        value_of::<usize>(&*self.scope, &LEVEL_KEY).map(|level| *level)
    }
}

/// Grow `settings.depth` levels of `settings.fanout` cancelable scopes under
/// `root`, each behind a value layer recording its level.
///
/// Cancel functions of inner nodes are dropped: those scopes end only by
/// inheritance.
pub fn build(root: Arc<CancelScope>, settings: &DemoSettings) -> Vec<Leaf> {
    let mut frontier = vec![(String::from("root"), root)];

    for level in 1..=settings.depth {
        let mut next = Vec::with_capacity(frontier.len() * settings.fanout);
        for (path, parent) in &frontier {
            for index in 0..settings.fanout {
                let layer = with_value(parent.clone(), LEVEL_KEY, level);
                let (scope, _cancel) = with_cancel(layer);
                let path = format!("{path}.{index}");
                tracing::debug!(path = %path, scope = %scope.id(), "derived scope");
                next.push((path, scope));
            }
        }
        frontier = next;
    }

    frontier
        .into_iter()
        .map(|(path, scope)| Leaf { path, scope })
        .collect()
}
