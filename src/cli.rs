use crate::Args;
use anyhow::{anyhow, bail, Context as _, Result};
use brandcheck::audit::AuditLog;
use brandcheck::config::OutputFormat;
use brandcheck::{Field, SchemaError, Validation, Validator};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::io::Read;
use std::path::Path;

pub struct Context {
    pub args: Args,
    pub session_id: String,
    pub format: OutputFormat,
    pub validator: Validator,
    pub audit: RefCell<Option<AuditLog>>,
}

/// A raw submission and where it came from
#[derive(Debug)]
pub struct Submission {
    pub source: String,
    pub raw: Value,
}

/// The form is filled in the same order as the web registration wizard
const FORM_STEPS: &[(&str, &[Field])] = &[
    ("Datos del negocio", &[Field::BusinessName, Field::FounderName]),
    (
        "Contacto",
        &[Field::Whatsapp, Field::Email, Field::InstagramUrl],
    ),
    ("Ubicación", &[Field::City, Field::Country]),
    ("Descripción", &[Field::Description]),
];

/// Validate every submission named on the command line.
/// Returns true if all of them passed.
pub fn run_batch(ctx: &Context) -> Result<bool> {
    let submissions = collect_submissions(&ctx.args.inputs, &ctx.args.fields)?;
    if submissions.is_empty() {
        bail!("Nothing to validate. Pass submission files, --field KEY=VALUE, or --interactive.");
    }

    log_event(ctx, |audit| audit.session_start("batch"));

    let mut all_valid = true;
    for submission in &submissions {
        all_valid &= evaluate(ctx, submission);
    }

    if ctx.args.verbose && ctx.format == OutputFormat::Text {
        eprintln!(
            "Session {}: {} submission(s) checked",
            ctx.session_id,
            submissions.len()
        );
    }

    Ok(all_valid)
}

/// Walk the registration form one step at a time, re-prompting any field
/// that fails its rule. Returns true if the finished form is valid.
pub fn run_interactive(ctx: &Context) -> Result<bool> {
    let mut rl = DefaultEditor::new()?;
    let rules = ctx.validator.rules();
    let mut form = Map::new();

    log_event(ctx, |audit| audit.session_start("interactive"));
    println!("brandcheck - registro de marca (Ctrl-D para cancelar)");

    for (step, (title, fields)) in FORM_STEPS.iter().enumerate() {
        println!("\nPaso {}/{}: {}", step + 1, FORM_STEPS.len(), title);

        for field in fields.iter().copied() {
            let Some(rule) = rules.rule_for(field) else {
                continue;
            };
            let prompt = if rule.required {
                format!("{}: ", rule.label.noun)
            } else {
                format!("{} (opcional): ", rule.label.noun)
            };

            loop {
                let line = match rl.readline(&prompt) {
                    Ok(line) => line,
                    Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                        println!("Registro cancelado.");
                        return Ok(false);
                    }
                    Err(e) => return Err(e.into()),
                };

                let raw = Some(line.as_str()).filter(|l| !l.trim().is_empty());
                match rules.check_field(field, raw) {
                    Ok(_) => {
                        if let Some(raw) = raw {
                            rl.add_history_entry(raw)?;
                            form.insert(
                                field.as_str().to_string(),
                                Value::String(raw.to_string()),
                            );
                        }
                        break;
                    }
                    Err(err) => println!("  {}", err.message),
                }
            }
        }
    }

    println!();
    let submission = Submission {
        source: "interactive".to_string(),
        raw: Value::Object(form),
    };
    Ok(evaluate(ctx, &submission))
}

/// Validate, audit and report one submission. Returns true if it passed.
fn evaluate(ctx: &Context, submission: &Submission) -> bool {
    match ctx.validator.validate(&submission.raw) {
        Ok(outcome) => {
            log_event(ctx, |audit| {
                audit.validation(&submission.source, &submission.raw, &outcome)
            });
            report(ctx, &submission.source, &outcome);
            outcome.is_valid()
        }
        Err(err) => {
            log_event(ctx, |audit| {
                audit.internal_error(&submission.source, &submission.raw, &err)
            });
            report_internal(ctx, &submission.source, &err);
            false
        }
    }
}

/// Audit failures are reported but never stop validation
fn log_event(ctx: &Context, write: impl FnOnce(&mut AuditLog) -> Result<()>) {
    if let Some(audit) = ctx.audit.borrow_mut().as_mut() {
        if let Err(e) = write(audit) {
            eprintln!("Warning: audit log write failed: {}", e);
        }
    }
}

fn report(ctx: &Context, source: &str, outcome: &Validation) {
    match ctx.format {
        OutputFormat::Json => {
            let mut line = serde_json::to_value(outcome).unwrap_or(Value::Null);
            if let Value::Object(map) = &mut line {
                map.insert("source".to_string(), Value::String(source.to_string()));
            }
            println!("{}", line);
        }
        OutputFormat::Text => match outcome {
            Validation::Valid { value } => {
                println!("ok    {}", source);
                if ctx.args.verbose {
                    if let Ok(pretty) = serde_json::to_string_pretty(value) {
                        println!("{}", pretty);
                    }
                }
            }
            Validation::Invalid { errors } => {
                println!("FAIL  {} ({} error(s))", source, errors.len());
                for error in errors {
                    println!("      {}: {}", error.field, error.message);
                }
            }
        },
    }
}

fn report_internal(ctx: &Context, source: &str, err: &SchemaError) {
    match ctx.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "source": source, "status": "error", "error": err.to_string() })
        ),
        OutputFormat::Text => println!("ERROR {}: {}", source, err),
    }
}

/// Gather submissions from input paths/globs and `--field` pairs
pub fn collect_submissions(inputs: &[String], fields: &[String]) -> Result<Vec<Submission>> {
    let mut submissions = Vec::new();

    for input in inputs {
        if input == "-" {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            let raw: Value = serde_json::from_str(&text).context("parsing JSON from stdin")?;
            push_submissions(&mut submissions, "stdin", raw);
        } else if is_glob(input) {
            let mut matched = glob::glob(input)
                .with_context(|| format!("invalid glob pattern '{}'", input))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if matched.is_empty() {
                bail!("No files match '{}'", input);
            }
            matched.sort();
            for path in matched {
                let raw = load_submission_file(&path)?;
                push_submissions(&mut submissions, &path.display().to_string(), raw);
            }
        } else {
            let path = Path::new(input);
            let raw = load_submission_file(path)?;
            push_submissions(&mut submissions, input, raw);
        }
    }

    if !fields.is_empty() {
        let mut form = Map::new();
        for arg in fields {
            let (key, value) = parse_field_arg(arg)?;
            if Field::from_key(key).is_none() {
                eprintln!("Warning: unknown field '{}' will be ignored", key);
            }
            form.insert(key.to_string(), Value::String(value.to_string()));
        }
        submissions.push(Submission {
            source: "--field".to_string(),
            raw: Value::Object(form),
        });
    }

    Ok(submissions)
}

/// A top-level array holds one submission per element
fn push_submissions(out: &mut Vec<Submission>, source: &str, raw: Value) {
    match raw {
        Value::Array(items) => {
            for (i, item) in items.into_iter().enumerate() {
                out.push(Submission {
                    source: format!("{}[{}]", source, i),
                    raw: item,
                });
            }
        }
        raw => out.push(Submission {
            source: source.to_string(),
            raw,
        }),
    }
}

/// Parse a submission file by extension; anything unrecognized is read as JSON
pub fn load_submission_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let value = match ext.as_deref() {
        Some("yaml") | Some("yml") => serde_yaml::from_str::<Value>(&content)
            .with_context(|| format!("parsing YAML {}", path.display()))?,
        Some("toml") => toml::from_str::<Value>(&content)
            .with_context(|| format!("parsing TOML {}", path.display()))?,
        _ => serde_json::from_str::<Value>(&content)
            .with_context(|| format!("parsing JSON {}", path.display()))?,
    };
    Ok(value)
}

/// Split `key=value`; the value may itself contain `=`
pub fn parse_field_arg(arg: &str) -> Result<(&str, &str)> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid --field '{}', expected KEY=VALUE", arg))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid --field '{}', key is empty", arg);
    }
    Ok((key, value))
}

fn is_glob(input: &str) -> bool {
    input.contains(['*', '?', '['])
}
