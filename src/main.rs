mod cli;

use anyhow::Result;
use brandcheck::audit::AuditLog;
use brandcheck::config::{self, OutputFormat};
use brandcheck::{sanitize, Validator};
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "brandcheck",
    about = "Validate and sanitize brand registration submissions"
)]
pub struct Args {
    #[arg(
        value_name = "INPUT",
        help = "Submission files or glob patterns (.json, .yaml, .toml); '-' reads JSON from stdin"
    )]
    pub inputs: Vec<String>,

    #[arg(
        long = "field",
        value_name = "KEY=VALUE",
        action = clap::ArgAction::Append,
        help = "Submission field (e.g., 'businessName=Café Paradiso')"
    )]
    pub fields: Vec<String>,

    #[arg(long, value_name = "TEXT", help = "Print the sanitized form of TEXT and exit")]
    pub sanitize: Option<String>,

    #[arg(short, long, help = "Fill in the registration form step by step")]
    pub interactive: bool,

    #[arg(long, value_name = "FORMAT", help = "Output format: text, json")]
    pub format: Option<String>,

    #[arg(long, env = "BRANDCHECK_CONFIG", help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "BRANDCHECK_AUDIT_DIR", help = "Audit log directory")]
    pub audit_dir: Option<PathBuf>,

    #[arg(long, help = "Do not write an audit log")]
    pub no_audit: bool,

    #[arg(long, help = "Print the effective configuration and exit")]
    pub show_config: bool,

    #[arg(long, help = "Verbose output (print normalized records)")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Some(text) = &args.sanitize {
        println!("{}", sanitize(text));
        return Ok(());
    }

    // Load configuration (layered over the built-in rule tables)
    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_explicit(config_path)?
    } else {
        config::Config::load().unwrap_or_else(|err| {
            eprintln!("Warning: failed to load config, using built-in rules: {:#}", err);
            config::Config::with_builtin_rules()
        })
    };

    // Apply CLI overrides
    if let Some(format_str) = &args.format {
        if let Some(format) = OutputFormat::from_str(format_str) {
            cfg.format = Some(format);
        } else {
            return Err(anyhow::anyhow!(
                "Invalid output format: {}. Use: text, json",
                format_str
            ));
        }
    }
    if let Some(dir) = &args.audit_dir {
        cfg.audit.dir = Some(dir.clone());
    }
    if args.no_audit {
        cfg.audit.enabled = Some(false);
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} error(s))",
            errors.len()
        ));
    }

    if args.show_config {
        print!("{}", toml::to_string_pretty(&cfg)?);
        return Ok(());
    }

    if args.debug {
        eprintln!(
            "[DEBUG] Disposable domains: {:?}",
            cfg.rules.disposable_domains
        );
        eprintln!("[DEBUG] Country codes: {:?}", cfg.rules.country_codes);
        eprintln!(
            "[DEBUG] Block disposable subdomains: {}",
            cfg.rules.blocks_subdomains()
        );
        eprintln!("[DEBUG] Max input chars: {}", cfg.rules.max_input_chars());
        eprintln!(
            "[DEBUG] Audit: {} ({})",
            cfg.audit.is_enabled(),
            cfg.audit.dir().display()
        );
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    let audit = if cfg.audit.is_enabled() {
        let log = AuditLog::in_dir(&cfg.audit.dir(), &session_id)?;
        if args.debug {
            eprintln!("[DEBUG] Audit log: {}", log.path.display());
        }
        Some(log)
    } else {
        None
    };

    let validator = Validator::new(&cfg.rules);
    let format = cfg.format.unwrap_or_default();
    if args.debug {
        eprintln!("[DEBUG] Output format: {}", format.as_str());
    }

    let ctx = cli::Context {
        args,
        session_id,
        format,
        validator,
        audit: RefCell::new(audit),
    };

    let all_valid = if ctx.args.interactive {
        cli::run_interactive(&ctx)?
    } else {
        cli::run_batch(&ctx)?
    };

    if !all_valid {
        std::process::exit(1);
    }
    Ok(())
}
