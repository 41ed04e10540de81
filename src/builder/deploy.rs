use std::sync::Arc;

use crate::builder::{Context, Phase, TaskUnit, watch_task};
use crate::config::DeploySpec;
use crate::task::{Task, watch_name};
use crate::toolchain::OutputCache;

pub(crate) const DEPLOY: &str = "deploy";

/// `deploy` copies the build output to its final place.
///
/// With a dev server running, `deployWatch` only rewrites files whose content
/// changed and then reloads the connected pages. Without one it simply
/// deploys again.
pub(crate) fn build(spec: &DeploySpec, cx: &Context) -> TaskUnit {
    let toolchain = cx.toolchain.clone();
    let (src, dest) = (spec.src.clone(), spec.dest.clone());
    let primary = Task::new(DEPLOY, move || toolchain.copy(&src, &dest));

    let target = match cx.serving {
        true => {
            let toolchain = cx.toolchain.clone();
            let (src, dest) = (spec.src.clone(), spec.dest.clone());
            let cache = Arc::new(OutputCache::new());

            Task::new(DEPLOY, move || {
                toolchain.copy_cached(&src, &dest, &cache)?;
                toolchain.reload()
            })
        }
        false => primary.clone(),
    };

    let watch = watch_task(&cx.toolchain, watch_name(DEPLOY), spec.src.clone(), target);

    TaskUnit::new("include.deploy", Phase::Deploy, primary).with_watch(watch)
}
