use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;

use ib_core::IbConfig;
use ib_core::Keyword;
use ib_core::LexOptions;
use ib_core::ParseResult;
use ib_core::Point;
use ib_core::lex;
use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp_server::Client;
use tower_lsp_server::LanguageServer;
use tower_lsp_server::jsonrpc::Result as LspResult;
use tower_lsp_server::ls_types::*;

/// Diagnostics published per document unless the client configures otherwise.
pub const DEFAULT_MAX_NUMBER_OF_PROBLEMS: usize = 1000;

/// State for a single open document.
#[derive(Debug, Clone)]
struct DocumentState {
	/// The client's version of the text that was lexed.
	version: i32,
	/// The result of the last lex of the document text.
	result: ParseResult,
}

/// Workspace-level state shared across all LSP requests.
#[derive(Debug)]
struct WorkspaceState {
	/// The workspace root path.
	root: Option<PathBuf>,
	/// Open documents keyed by URI.
	documents: HashMap<Uri, DocumentState>,
	/// Lex options from `ib.toml` in the workspace root.
	options: LexOptions,
	/// Cap on the diagnostics published for one document.
	max_number_of_problems: usize,
}

impl Default for WorkspaceState {
	fn default() -> Self {
		Self {
			root: None,
			documents: HashMap::new(),
			options: LexOptions::default(),
			max_number_of_problems: DEFAULT_MAX_NUMBER_OF_PROBLEMS,
		}
	}
}

impl WorkspaceState {
	/// Reload lex options from the config file in the workspace root.
	fn load_config(&mut self) {
		let Some(root) = &self.root else {
			return;
		};

		match IbConfig::load(root) {
			Ok(config) => self.options = LexOptions::from_config(config.as_ref()),
			Err(e) => tracing::warn!(error = %e, "failed to load config, using defaults"),
		}
	}

	/// Cache the lex result for a document. A result for a version older than
	/// the cached one is dropped and `false` is returned.
	fn store_document(&mut self, uri: &Uri, version: i32, result: ParseResult) -> bool {
		if self
			.documents
			.get(uri)
			.is_some_and(|doc| doc.version > version)
		{
			return false;
		}

		self.documents
			.insert(uri.clone(), DocumentState { version, result });
		true
	}

	/// Apply the `ib` section of a `workspace/didChangeConfiguration` payload.
	fn apply_settings(&mut self, settings: &Value) {
		let section = settings.get("ib").unwrap_or(settings);

		if let Some(max) = section
			.get("maxNumberOfProblems")
			.and_then(Value::as_u64)
			.and_then(|max| usize::try_from(max).ok())
		{
			self.max_number_of_problems = max;
		}
	}
}

/// The file system path a document is lexed as. Documents without a file
/// path (e.g. untitled buffers) use the URI path, which finds no project root.
fn document_path(uri: &Uri) -> PathBuf {
	uri.to_file_path()
		.map_or_else(|| PathBuf::from(uri.path().as_str()), std::borrow::Cow::into_owned)
}

fn to_lsp_position(point: Point) -> Position {
	Position {
		line: point.line as u32,
		character: point.column as u32,
	}
}

fn to_point(position: Position) -> Point {
	Point::new(position.line as usize, position.character as usize)
}

/// The range covered by `len` bytes starting at `point` on a single line.
fn to_lsp_range(point: Point, len: usize) -> Range {
	let start = to_lsp_position(point);
	Range {
		start,
		end: Position {
			line: start.line,
			character: start.character + len as u32,
		},
	}
}

/// The IB language server.
#[derive(Debug)]
pub struct IbLanguageServer {
	client: Client,
	state: RwLock<WorkspaceState>,
}

impl IbLanguageServer {
	pub fn new(client: Client) -> Self {
		Self {
			client,
			state: RwLock::new(WorkspaceState::default()),
		}
	}

	/// Publish diagnostics for a single document.
	async fn publish_diagnostics_for(&self, uri: &Uri) {
		let diagnostics = {
			let state = self.state.read().await;
			compute_diagnostics(&state, uri)
		};

		self.client
			.publish_diagnostics(uri.clone(), diagnostics, None)
			.await;
	}

	/// Lex the new content of a document and publish its diagnostics.
	///
	/// Lexing reads included files from disk, so it runs on the blocking pool
	/// without holding the state lock.
	async fn on_document_change(&self, uri: &Uri, version: i32, content: String) {
		let options = self.state.read().await.options.clone();
		let path = document_path(uri);

		let result =
			match tokio::task::spawn_blocking(move || lex(&path, content.as_bytes(), &options)).await {
				Ok(result) => result,
				Err(e) => {
					tracing::error!(uri = uri.as_str(), error = %e, "lexing task failed");
					return;
				}
			};

		let stored = self.state.write().await.store_document(uri, version, result);
		if stored {
			self.publish_diagnostics_for(uri).await;
		}
	}
}

impl LanguageServer for IbLanguageServer {
	async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
		let root = params
			.workspace_folders
			.as_ref()
			.and_then(|folders| folders.first())
			.and_then(|folder| folder.uri.to_file_path().map(std::borrow::Cow::into_owned))
			.or_else(|| {
				#[allow(deprecated)]
				params
					.root_uri
					.as_ref()
					.and_then(|uri| uri.to_file_path().map(std::borrow::Cow::into_owned))
			});

		{
			let mut state = self.state.write().await;
			state.root = root;
			state.load_config();
			if let Some(settings) = &params.initialization_options {
				state.apply_settings(settings);
			}
		}

		Ok(InitializeResult {
			capabilities: ServerCapabilities {
				text_document_sync: Some(TextDocumentSyncCapability::Kind(
					TextDocumentSyncKind::FULL,
				)),
				hover_provider: Some(HoverProviderCapability::Simple(true)),
				completion_provider: Some(CompletionOptions::default()),
				..Default::default()
			},
			server_info: Some(ServerInfo {
				name: "ib-lsp".to_string(),
				version: Some(env!("CARGO_PKG_VERSION").to_string()),
			}),
			offset_encoding: None,
		})
	}

	async fn initialized(&self, _: InitializedParams) {
		self.client
			.log_message(MessageType::INFO, "ib language server initialized")
			.await;
	}

	async fn shutdown(&self) -> LspResult<()> {
		Ok(())
	}

	async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
		let uris: Vec<Uri> = {
			let mut state = self.state.write().await;
			state.apply_settings(&params.settings);
			state.documents.keys().cloned().collect()
		};

		for uri in &uris {
			self.publish_diagnostics_for(uri).await;
		}
	}

	async fn did_open(&self, params: DidOpenTextDocumentParams) {
		let document = params.text_document;
		self.on_document_change(&document.uri, document.version, document.text)
			.await;
	}

	async fn did_change(&self, params: DidChangeTextDocumentParams) {
		let document = params.text_document;

		// Full sync: the last change carries the whole document.
		if let Some(change) = params.content_changes.into_iter().next_back() {
			self.on_document_change(&document.uri, document.version, change.text)
				.await;
		}
	}

	async fn did_close(&self, params: DidCloseTextDocumentParams) {
		let uri = params.text_document.uri;
		{
			let mut state = self.state.write().await;
			state.documents.remove(&uri);
		}
		self.client.publish_diagnostics(uri, Vec::new(), None).await;
	}

	async fn hover(&self, params: HoverParams) -> LspResult<Option<Hover>> {
		let uri = &params.text_document_position_params.text_document.uri;
		let position = params.text_document_position_params.position;

		let state = self.state.read().await;
		Ok(compute_hover(&state, uri, position))
	}

	async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
		let uri = &params.text_document_position.text_document.uri;

		let state = self.state.read().await;
		let items = compute_completions(&state, uri);

		if items.is_empty() {
			Ok(None)
		} else {
			Ok(Some(CompletionResponse::Array(items)))
		}
	}
}

/// Include diagnostics raised by the document's own directives, as warnings,
/// capped at the configured maximum.
fn compute_diagnostics(state: &WorkspaceState, uri: &Uri) -> Vec<Diagnostic> {
	let Some(doc) = state.documents.get(uri) else {
		return Vec::new();
	};

	doc.result
		.own_diagnostics()
		.take(state.max_number_of_problems)
		.map(|diagnostic| {
			Diagnostic {
				range: to_lsp_range(diagnostic.position, Keyword::Include.as_str().len()),
				severity: Some(DiagnosticSeverity::WARNING),
				code: Some(NumberOrString::String(diagnostic.code().to_string())),
				source: Some("ib".to_string()),
				message: diagnostic.message(),
				..Default::default()
			}
		})
		.collect()
}

/// Describe the token under the cursor.
fn compute_hover(state: &WorkspaceState, uri: &Uri, position: Position) -> Option<Hover> {
	let doc = state.documents.get(uri)?;
	let token = doc.result.token_at(to_point(position))?;
	let start = token.position?;

	let delimiter = match token.leading_delimiter {
		Some(delimiter) if delimiter.is_whitespace() => format!("`{delimiter:?}`"),
		Some(delimiter) => format!("`{delimiter}`"),
		None => "none".to_string(),
	};

	let mut value = format!("**Token:** `{}`", token.text);
	if let Some(keyword) = token.keyword() {
		value.push_str(&format!(" (keyword `{keyword}`)"));
	}
	value.push_str(&format!(
		"\n\n**Position:** line {}, column {}",
		start.line + 1,
		start.column + 1
	));
	value.push_str(&format!("\n\n**Leading delimiter:** {delimiter}"));

	Some(Hover {
		contents: HoverContents::Markup(MarkupContent {
			kind: MarkupKind::Markdown,
			value,
		}),
		range: Some(to_lsp_range(start, token.text.len())),
	})
}

/// The language keywords, then every distinct identifier of the document in
/// first-seen order.
fn compute_completions(state: &WorkspaceState, uri: &Uri) -> Vec<CompletionItem> {
	let Some(doc) = state.documents.get(uri) else {
		return Vec::new();
	};

	let mut items: Vec<CompletionItem> = Keyword::ALL
		.iter()
		.map(|keyword| {
			CompletionItem {
				label: keyword.as_str().to_string(),
				kind: Some(CompletionItemKind::KEYWORD),
				..Default::default()
			}
		})
		.collect();

	let mut seen = HashSet::new();
	for token in &doc.result.tokens {
		if token.keyword().is_some() || !seen.insert(token.text.as_str()) {
			continue;
		}

		items.push(CompletionItem {
			label: token.text.clone(),
			kind: Some(CompletionItemKind::TEXT),
			detail: token.is_included().then(|| "included".to_string()),
			..Default::default()
		});
	}

	items
}

/// Start the LSP server on stdin/stdout. This is used by the `ib lsp` CLI
/// subcommand.
pub async fn run_server() {
	let stdin = tokio::io::stdin();
	let stdout = tokio::io::stdout();

	let (service, socket) = tower_lsp_server::LspService::new(IbLanguageServer::new);
	tower_lsp_server::Server::new(stdin, stdout, socket)
		.serve(service)
		.await;
}

#[cfg(test)]
mod __tests;
