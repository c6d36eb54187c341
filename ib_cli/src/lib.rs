use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Tokenize IB source files and check their include directives.",
	long_about = "ib lexes source files written in the IB definition language into position \
	              annotated token streams, resolving `include` directives against the \
	              project's `source` directory.\n\nQuick start:\n  ib lex source/main.ib  Print \
	              the tokens of a file\n  ib root source/main.ib Print the project root of a \
	              file\n  ib check               Report broken includes across a project\n  ib \
	              lsp                 Run the language server"
)]
pub struct IbCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project directory. Config files are read from here and
	/// `check` walks it. Defaults to the current directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output and debug logging.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Print the tokens of an IB source file.
	///
	/// Each token is printed on its own line as `line:column`, its leading
	/// delimiter (`_` when there is none) and its text. Tokens spliced in
	/// from included files print `-:-` in place of a position. Include
	/// problems are reported on stderr as warnings and do not change the exit
	/// code.
	Lex {
		/// The file to lex.
		file: PathBuf,

		/// Output format. Use `text` for one token per line or `json` for the
		/// full parse result.
		#[arg(long, value_enum, default_value_t = LexOutputFormat::Text)]
		format: LexOutputFormat,
	},
	/// Print the project root that include directives in a file resolve
	/// against.
	///
	/// The root is the nearest ancestor directory named `source` that has a
	/// `system` subdirectory. Exits with a non-zero status code if there is
	/// none.
	Root {
		/// The file whose project root to find.
		file: PathBuf,
	},
	/// Lex every IB file in the project and report broken includes.
	///
	/// Walks the project directory (respecting `.gitignore` and the exclude
	/// patterns from `ib.toml`) and reports every include directive that
	/// could not be followed. Exits with a non-zero status code if any were
	/// found.
	Check {
		/// Output format for check results. Use `text` for human-readable
		/// output, `json` for programmatic consumption, or `github` for
		/// GitHub Actions annotations that appear inline on PRs.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Start the IB language server (LSP).
	///
	/// Communicates over stdin/stdout using the Language Server Protocol.
	/// Provides include diagnostics, hover information for tokens, and
	/// completion of keywords and identifiers.
	Lsp,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
	/// GitHub Actions annotation format. Emits `::warning` annotations that
	/// appear inline on pull request diffs.
	Github,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LexOutputFormat {
	/// One token per line.
	Text,
	/// The parse result as JSON.
	Json,
}
