use crate::pipeline::PipelineConfig;

/// Internal validation, called automatically during `PipelineConfig::from_str` / `load`.
///
/// Windowing arithmetic (step sizes, overlap ratio, time caps) is checked by
/// the windower itself when the pipeline bootstraps.
pub(crate) fn validate(config: &PipelineConfig) -> anyhow::Result<()> {
    if config.sources.is_empty() {
        anyhow::bail!("at least one [source.<name>] section is required");
    }

    if config.pipeline.max_split_depth == 0 {
        anyhow::bail!("pipeline.max_split_depth must be > 0");
    }

    if config
        .pipeline
        .max_window_bytes
        .is_some_and(|limit| limit.as_bytes() == 0)
    {
        anyhow::bail!("pipeline.max_window_bytes must be > 0");
    }

    for source in &config.sources {
        // Source names key checkpoint files on disk.
        if !is_valid_source_name(&source.name) {
            anyhow::bail!(
                "source {:?}: name must match [A-Za-z0-9_-]+",
                source.name,
            );
        }

        if let (Some(from), Some(to)) = (source.from_date, source.to_date) {
            if from > to {
                anyhow::bail!(
                    "source {:?}: from_date ({from}) is after to_date ({to})",
                    source.name,
                );
            }
        }
    }

    Ok(())
}

fn is_valid_source_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
