use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command as Shell, Stdio};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use docx_fill::questions::{questions_for, ContextQuestions, PromptQuestions};
use docx_fill::validate::validate_docx;
use docx_fill::{detect_with, fill_with_report, Answers, InstanceId, Settings, WordDocument};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect placeholders and print fields, instances and a summary as JSON.
    Detect {
        input: PathBuf,

        /// Pretty-print the JSON.
        #[arg(long)]
        pretty: bool,
    },
    /// Fill placeholders from a JSON answers file.
    Fill {
        input: PathBuf,

        /// JSON object of field key to value.
        #[arg(long)]
        answers: PathBuf,

        /// JSON object of instance id (e.g. `p3-s10-e20`) to value.
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Output .docx path.
        #[arg(long)]
        out: PathBuf,

        /// Also write an HTML preview of the filled document.
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Print the question asked for each detected field as JSON.
    Questions { input: PathBuf },
    /// Check that a file is an acceptable .docx upload.
    Validate {
        input: PathBuf,

        /// Size limit in MB (defaults to the configured limit).
        #[arg(long)]
        max_size_mb: Option<u64>,
    },
}

fn open(path: &Path, settings: &Settings) -> Result<WordDocument> {
    validate_docx(path, settings.max_file_size_bytes())
        .with_context(|| format!("validate {}", path.display()))?;
    WordDocument::open(path).with_context(|| format!("open {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

fn run_detect(input: &Path, pretty: bool, settings: &Settings) -> Result<()> {
    let doc = open(input, settings)?;
    let result = detect_with(&doc, settings);
    if result.only_false_positives() {
        eprintln!(
            "{} pattern(s) matched but all looked like references or boilerplate",
            result.raw_field_count
        );
    } else if result.is_empty() {
        eprintln!(
            "no placeholders found; check that the document uses {{{{NAME}}}}, [Name] or ____ blanks"
        );
    }

    let out = serde_json::json!({
        "fields": result.fields,
        "candidates": result.candidates,
        "raw_field_count": result.raw_field_count,
        "summary": result.summary(),
    });
    let text = if pretty {
        serde_json::to_string_pretty(&out)?
    } else {
        serde_json::to_string(&out)?
    };
    println!("{text}");
    Ok(())
}

fn run_fill(
    input: &Path,
    answers: &Path,
    overrides: Option<&Path>,
    out: &Path,
    preview: Option<&Path>,
    settings: &Settings,
) -> Result<()> {
    let doc = open(input, settings)?;
    let mut answers = Answers::from_fields(read_json::<BTreeMap<String, String>>(answers)?);

    if let Some(path) = overrides {
        let detected = detect_with(&doc, settings);
        let requested: BTreeMap<InstanceId, String> = read_json(path)?;
        for (id, value) in requested {
            let owned = detected
                .fields
                .keys()
                .any(|key| detected.owns_instance(key, &id));
            if owned {
                answers.overrides.insert(id, value);
            } else {
                warn!(locator = %id, "override does not match a detected placeholder, ignored");
            }
        }
    }

    let (filled, report) = fill_with_report(&doc, &answers).context("fill placeholders")?;
    filled.save(out).with_context(|| format!("write {}", out.display()))?;
    info!(
        out = %out.display(),
        replacements = report.total_replacements(),
        unresolved = report.unresolved.len(),
        "document written"
    );

    if let Some(path) = preview {
        fs::write(path, docx_fill::preview::render_html(&filled))
            .with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}

/// Send `prompt` to `command` on stdin and return its stdout.
fn ask_command(command: &str, prompt: &str) -> Option<String> {
    let mut child = Shell::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| warn!(command, error = %e, "question command failed to start"))
        .ok()?;
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(prompt.as_bytes()) {
            warn!(command, error = %e, "could not send prompt");
        }
    }
    let output = child
        .wait_with_output()
        .map_err(|e| warn!(command, error = %e, "question command failed"))
        .ok()?;
    if !output.status.success() {
        warn!(command, status = %output.status, "question command exited with an error");
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn run_questions(input: &Path, settings: &Settings) -> Result<()> {
    let doc = open(input, settings)?;
    let result = detect_with(&doc, settings);
    let questions = match (settings.use_llm, settings.question_command.as_deref()) {
        (true, Some(command)) => {
            let source = PromptQuestions::new(|prompt: &str| ask_command(command, prompt));
            source.batch_questions_for(&result)
        }
        (true, None) => {
            warn!("use_llm is set but no question_command is configured");
            questions_for(&result, &ContextQuestions)
        }
        (false, _) => questions_for(&result, &ContextQuestions),
    };
    println!("{}", serde_json::to_string_pretty(&questions)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::new().context("load settings")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match args.command {
        Command::Detect { input, pretty } => run_detect(&input, pretty, &settings),
        Command::Fill {
            input,
            answers,
            overrides,
            out,
            preview,
        } => run_fill(
            &input,
            &answers,
            overrides.as_deref(),
            &out,
            preview.as_deref(),
            &settings,
        ),
        Command::Questions { input } => run_questions(&input, &settings),
        Command::Validate { input, max_size_mb } => {
            let max_mb = max_size_mb.unwrap_or(settings.max_file_size_mb);
            let ok = validate_docx(&input, max_mb * 1024 * 1024)
                .with_context(|| format!("validate {}", input.display()))?;
            println!("{}", serde_json::to_string(&ok)?);
            Ok(())
        }
    }
}
