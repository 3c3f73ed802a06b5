//! Reconcile command implementation

use anyhow::{anyhow, Result};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::reconcile::{reconcile, ReconcileMode, ReconcileOptions, ReconcileReport};
use crate::source::{JsonSource, LeadSource, SourceRegistry};
use crate::store::LeadStore;

pub fn run(
    store: &LeadStore,
    registry: &SourceRegistry,
    config: &Config,
    source: Option<String>,
    file: Option<String>,
    mode: Option<String>,
    json: bool,
) -> Result<()> {
    let mode: Option<ReconcileMode> = mode.as_deref().map(str::parse::<ReconcileMode>).transpose()?;

    let adhoc;
    let sources: Vec<&dyn LeadSource> = match (source, file) {
        (_, Some(path)) => {
            let path = shellexpand::tilde(&path).to_string();
            adhoc = JsonSource::new("file", path, mode.unwrap_or(ReconcileMode::Import));
            vec![&adhoc as &dyn LeadSource]
        }
        (Some(name), None) => vec![registry
            .get_source(&name)
            .ok_or_else(|| anyhow!("Source not found or disabled: {}", name))?],
        (None, None) => registry.available_sources(),
    };

    if sources.is_empty() {
        println!("No sources available. Check your configuration or pass --file.");
        return Ok(());
    }

    let mut total = ReconcileReport::default();

    for source in sources {
        if !json {
            println!("📥 {} ({})", source.id(), source.description());
        }

        let batch = match source.load() {
            Ok(batch) => batch,
            Err(e) => {
                total.errors.push(format!("{}: {}", source.id(), e));
                continue;
            }
        };

        let options = ReconcileOptions {
            mode: mode.unwrap_or(source.mode()),
            max_attempts: config.dialer.default_max_attempts,
            import_batch: Some(batch.tag.clone()),
        };

        let mut report = reconcile(store, batch.rows, &options, SystemClock.now());
        let mut errors = batch.errors;
        errors.append(&mut report.errors);
        report.errors = errors;

        if !json {
            print_report(&report, "   ");
            println!();
        }
        total.merge(report);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&total)?);
    } else {
        println!("✅ Reconciliation complete");
        print_report(&total, "");
    }
    Ok(())
}

fn print_report(report: &ReconcileReport, indent: &str) {
    println!(
        "{}imported {} | duplicates {} | updated {} | skipped {} | errors {}",
        indent,
        report.imported,
        report.duplicates,
        report.updated,
        report.skipped,
        report.errors.len()
    );
    for error in &report.errors {
        println!("{}  ! {}", indent, error);
    }
}
