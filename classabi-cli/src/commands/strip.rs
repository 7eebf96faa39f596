use std::{
    path::Path,
    sync::{atomic::AtomicBool, Arc},
};

use anyhow::Context;
use classabi::{strip_jar, AbiConfig};

use crate::{
    app::GlobalOptions,
    commands::common::{exit_if_cancelled, StripInfo},
    output::print_output,
};

pub fn run(
    input: &Path,
    output: &Path,
    config: &AbiConfig,
    cancel: &Arc<AtomicBool>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let summary = strip_jar(input, output, config, Some(Arc::clone(cancel)))
        .map_err(exit_if_cancelled)
        .with_context(|| format!("failed to strip {}", input.display()))?;

    let info = StripInfo::new(input, output, &summary);
    print_output(&info, opts, |info| {
        println!("{}", info.line());
        for name in &info.deleted {
            log::debug!("  deleted {name}");
        }
    })
}
