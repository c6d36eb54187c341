use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use ib_cli::Commands;
use ib_cli::IbCli;
use ib_cli::LexOutputFormat;
use ib_cli::OutputFormat;
use ib_core::IbConfig;
use ib_core::IncludeDiagnostic;
use ib_core::IncludeDiagnosticKind;
use ib_core::LexOptions;
use ib_core::find_project_root;
use ib_core::lex_file;
use ib_core::project::CheckOptions;
use ib_core::project::ProjectReport;
use ib_core::project::check_project;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "IB_LOG";

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = IbCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Lex { file, format }) => run_lex(&args, file, *format),
		Some(Commands::Root { file }) => run_root(file),
		Some(Commands::Check { format }) => run_check(&args, *format),
		Some(Commands::Lsp) => run_lsp(),
		None => {
			eprintln!("No subcommand specified. Run `ib --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<ib_core::IbError>() {
			Ok(ib_err) => {
				let report: miette::Report = (*ib_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr so stdout stays free for command output and the LSP
/// transport. `IB_LOG` overrides the level chosen by `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let fallback = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.try_init()
		.ok();
}

fn resolve_root(args: &IbCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(root: &Path) -> Result<Option<IbConfig>, Box<dyn std::error::Error>> {
	let config = IbConfig::load(root)?;
	if config.is_none() {
		tracing::debug!(dir = %root.display(), "no config file found, using defaults");
	}
	Ok(config)
}

fn run_lex(
	args: &IbCli,
	file: &Path,
	format: LexOutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = load_config(&root)?;
	let options = LexOptions::from_config(config.as_ref());
	let result = lex_file(file, &options)?;

	match format {
		LexOutputFormat::Text => {
			for token in &result.tokens {
				println!("{token}");
			}
		}
		LexOutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(&result)?);
		}
	}

	if args.verbose {
		match &result.root {
			Some(project_root) => eprintln!("project root: {}", project_root.display()),
			None => eprintln!("project root: none (include directives are ordinary tokens)"),
		}
		eprintln!(
			"{} token(s), {} included",
			result.tokens.len(),
			result.tokens.iter().filter(|t| t.is_included()).count()
		);
	}

	for diagnostic in &result.diagnostics {
		let rel = make_relative(&diagnostic.file, &root);
		eprintln!("{:?}", diagnostic_to_report(diagnostic, &rel));
	}

	Ok(())
}

fn run_root(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
	let Some(root) = find_project_root(file) else {
		eprintln!(
			"{} no `source` directory with a `system` subdirectory encloses `{}`",
			colored!("warning:", yellow),
			file.display()
		);
		process::exit(1);
	};

	println!("{}", root.display());
	Ok(())
}

fn run_check(args: &IbCli, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = load_config(&root)?;
	let options = CheckOptions::from_config(config.as_ref());
	let report = check_project(&root, &options)?;

	if args.verbose {
		for file in &report.files {
			eprintln!(
				"  {} ({} token(s))",
				make_relative(&file.file, &root),
				file.token_count
			);
		}
	}

	if report.is_ok() {
		match format {
			OutputFormat::Json => {
				let output = serde_json::json!({
					"ok": true,
					"files": report.files.len(),
					"diagnostics": [],
				});
				println!("{output}");
			}
			OutputFormat::Github | OutputFormat::Text => {
				println!(
					"{} {} file(s) checked, all includes resolve.",
					colored!("Check passed:", green),
					report.files.len()
				);
			}
		}
		return Ok(());
	}

	match format {
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = report
				.diagnostics()
				.map(|diagnostic| {
					serde_json::json!({
						"file": make_relative(&diagnostic.file, &root),
						"line": diagnostic.position.line + 1,
						"column": diagnostic.position.column + 1,
						"code": diagnostic.code(),
						"message": diagnostic.message(),
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": false,
				"files": report.files.len(),
				"diagnostics": entries,
			});
			println!("{output}");
		}
		OutputFormat::Github => {
			for diagnostic in report.diagnostics() {
				println!(
					"::warning file={},line={},col={}::{}",
					make_relative(&diagnostic.file, &root),
					diagnostic.position.line + 1,
					diagnostic.position.column + 1,
					diagnostic.message()
				);
			}
			eprintln!("{}", check_summary(&report));
		}
		OutputFormat::Text => {
			eprintln!("Check failed.");
			for diagnostic in report.diagnostics() {
				let rel = make_relative(&diagnostic.file, &root);
				eprintln!("{:?}", diagnostic_to_report(diagnostic, &rel));
			}
			eprintln!("{}", check_summary(&report));
		}
	}

	process::exit(1);
}

fn check_summary(report: &ProjectReport) -> String {
	let failing = report
		.files
		.iter()
		.filter(|file| !file.diagnostics.is_empty())
		.count();

	format!(
		"{} {} broken include(s) in {failing} of {} file(s)",
		colored!("error:", red),
		report.diagnostic_count(),
		report.files.len()
	)
}

fn run_lsp() -> Result<(), Box<dyn std::error::Error>> {
	let rt = tokio::runtime::Runtime::new()?;
	rt.block_on(ib_lsp::run_server());
	Ok(())
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

fn include_help(kind: &IncludeDiagnosticKind) -> Option<&'static str> {
	match kind {
		IncludeDiagnosticKind::MissingSpecifier => {
			Some("quote the file to include on the same line, e.g. `include \"defs\"`")
		}
		IncludeDiagnosticKind::UnterminatedSpecifier { .. } => {
			Some("close the file specifier with a quote before the end of the line")
		}
		IncludeDiagnosticKind::NotFound { .. } => {
			Some("include specifiers resolve against the project's `source` directory")
		}
		IncludeDiagnosticKind::Unreadable { .. } => Some("check the permissions of the included file"),
		IncludeDiagnosticKind::Cycle { .. } => {
			Some("remove one of the include directives that form the cycle")
		}
		IncludeDiagnosticKind::DepthExceeded { .. } => {
			Some("raise `max_include_depth` in ib.toml or flatten the include chain")
		}
		_ => None,
	}
}

/// Convert an `IncludeDiagnostic` into a warning `miette::Report` with its
/// code and help text for rich terminal display.
fn diagnostic_to_report(diagnostic: &IncludeDiagnostic, rel_path: &str) -> miette::Report {
	let location = format!(
		"{rel_path}:{}:{}",
		diagnostic.position.line + 1,
		diagnostic.position.column + 1
	);
	let message = format!("[{location}] {}", diagnostic.message());

	let mut value = miette::MietteDiagnostic::new(message)
		.with_code(diagnostic.code())
		.with_severity(miette::Severity::Warning);
	if let Some(help) = include_help(&diagnostic.kind) {
		value = value.with_help(help);
	}

	miette::Report::new(value)
}
