use anyhow::Context;
use folio_core::load_site_config;
use folio_validator::validate_site;
use std::path::PathBuf;

pub fn run(config_path: PathBuf) -> anyhow::Result<()> {
    println!("Validating site: {}", config_path.display());

    let config = load_site_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    println!("✓ {} valid", config_path.display());

    let report = validate_site(&config);

    for line in &report.info {
        println!("  {}", line);
    }
    for warning in &report.warnings {
        log::warn!("{}", warning);
    }
    for error in &report.errors {
        log::error!("{}", error);
    }

    if !report.is_ok() {
        anyhow::bail!("Validation failed with {} error(s)", report.errors.len());
    }

    println!(
        "\n✅ Site is valid ({} warning(s))",
        report.warnings.len()
    );
    Ok(())
}
