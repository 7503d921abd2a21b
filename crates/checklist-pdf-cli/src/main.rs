//! Checklist PDF CLI - fill a checklist template from a JSON submission.

use anyhow::{Context, Result, bail};
use checklist_pdf_core::{
    AppConfig, AssemblyInput, DocumentAssembler, FieldDescriptor, ImageSlot, Submission,
    list_fields, load_attachment, util,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "checklist-pdf")]
#[command(author, version, about = "Fill a maintenance checklist PDF", long_about = None)]
struct Args {
    /// Submission JSON file
    #[arg(required_unless_present = "list_fields")]
    submission: Option<PathBuf>,

    /// Template PDF (default: template_path from config)
    #[arg(short, long, env = "CHECKLIST_TEMPLATE")]
    template: Option<PathBuf>,

    /// Image for a slot, e.g. "photo_1=front.jpg" or "engineer_signature=sig.png"
    #[arg(short, long = "image", value_name = "SLOT=PATH")]
    images: Vec<String>,

    /// JSON list of expected fields to check against the template
    #[arg(long)]
    descriptors: Option<PathBuf>,

    /// Output PDF file (default: <output_dir>/<site name>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file path
    #[arg(short, long, env = "CHECKLIST_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the template's fields as JSON and exit
    #[arg(long)]
    list_fields: bool,
}

/// Split a `SLOT=PATH` argument.
fn parse_image_arg(arg: &str) -> Result<(ImageSlot, PathBuf)> {
    let (slot, path) = arg
        .split_once('=')
        .with_context(|| format!("Expected SLOT=PATH, got '{arg}'"))?;
    let slot = ImageSlot::parse(slot).with_context(|| {
        format!("Unknown image slot '{slot}' (use photo_<n>, engineer_signature or customer_signature)")
    })?;
    if path.trim().is_empty() {
        bail!("Missing path for image slot {slot}");
    }
    Ok((slot, PathBuf::from(path.trim())))
}

fn default_output(config: &AppConfig, submission: &Submission, source: &Path) -> PathBuf {
    let stem = submission.text("site_name").unwrap_or_else(|| {
        source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("checklist")
            .to_string()
    });
    config
        .output_dir()
        .join(format!("{}.pdf", util::file_stem(&stem)))
}

fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = AppConfig::load_from(args.config.as_deref()).context("Failed to load config file")?;

    let template_path = args
        .template
        .clone()
        .or_else(|| config.template_path.clone())
        .context("No template given (use --template or set template_path in config)")?;

    if args.list_fields {
        let fields = list_fields(&template_path)
            .with_context(|| format!("Failed to read fields of {}", template_path.display()))?;
        // CLI output is intentional
        #[allow(clippy::print_stdout)]
        {
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }
        return Ok(());
    }

    let submission_path = args
        .submission
        .as_deref()
        .context("A submission file is required")?;
    let submission = Submission::from_json(
        &std::fs::read_to_string(submission_path)
            .with_context(|| format!("Failed to read {}", submission_path.display()))?,
    )?;

    let mut attachments = Vec::with_capacity(args.images.len());
    for arg in &args.images {
        let (slot, path) = parse_image_arg(arg)?;
        match load_attachment(slot, &path) {
            Ok(attachment) => attachments.push(attachment),
            // One bad image should not cost the whole document
            Err(e) => warn!("Skipping {} ({}): {}", slot, path.display(), e),
        }
    }

    let descriptors: Vec<FieldDescriptor> = match &args.descriptors {
        Some(path) => serde_json::from_str(
            &std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        )
        .context("Invalid descriptor list")?,
        None => Vec::new(),
    };

    info!("Loading template: {}", template_path.display());
    let template = std::fs::read(&template_path)
        .with_context(|| format!("Failed to read template: {}", template_path.display()))?;
    let template_name = template_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("template.pdf")
        .to_string();

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&config, &submission, submission_path));

    let assembler = DocumentAssembler::new(config).context("Failed to load fonts")?;
    let assembly = assembler
        .assemble(&AssemblyInput {
            template,
            template_name,
            submission,
            attachments,
            descriptors,
        })
        .context("Failed to assemble checklist")?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&output_path, &assembly.pdf)
        .with_context(|| format!("Failed to write output: {}", output_path.display()))?;

    let audit_path = output_path.with_extension("audit.json");
    assembly
        .audit
        .write_to(&audit_path)
        .with_context(|| format!("Failed to write audit: {}", audit_path.display()))?;

    for skipped in &assembly.audit.skipped_fields {
        warn!("Field {} left unset: {}", skipped.field, skipped.reason);
    }

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!(
            "Checklist saved to: {} ({} pages, {} overflow)",
            output_path.display(),
            assembly.audit.page_count,
            assembly.audit.overflow.len()
        );
        println!("Audit record: {}", audit_path.display());
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_arg() {
        let (slot, path) = parse_image_arg("photo_2=shots/front.jpg").unwrap();
        assert_eq!(slot, ImageSlot::Photo(2));
        assert_eq!(path, PathBuf::from("shots/front.jpg"));

        assert!(parse_image_arg("front.jpg").is_err());
        assert!(parse_image_arg("selfie=me.png").is_err());
        assert!(parse_image_arg("customer_signature=").is_err());
    }

    #[test]
    fn test_default_output_uses_site_name() {
        let config = AppConfig::default();
        let mut submission = Submission::default();
        submission.push_value("site_name", "Plant Room #2".to_string());
        let out = default_output(&config, &submission, Path::new("in/sub.json"));
        assert_eq!(out, PathBuf::from("output/Plant_Room_2.pdf"));

        let out = default_output(&config, &Submission::default(), Path::new("in/sub.json"));
        assert_eq!(out, PathBuf::from("output/sub.pdf"));
    }

    #[test]
    fn test_args_require_submission() {
        assert!(Args::try_parse_from(["checklist-pdf"]).is_err());
        assert!(Args::try_parse_from(["checklist-pdf", "--list-fields", "-t", "a.pdf"]).is_ok());
    }
}
