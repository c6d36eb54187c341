use std::path::Path;

use rstest::rstest;
use similar_asserts::assert_eq;
#[allow(unused_imports)]
use tower_lsp_server::ls_types::*;

use super::*;

fn file_uri(path: &Path) -> Uri {
	format!("file://{}", path.display())
		.parse::<Uri>()
		.unwrap_or_else(|_| panic!("invalid test URI"))
}

/// Lex `content` as version `version` of `uri` and cache it, as an open or
/// change notification does.
fn lex_into(state: &mut WorkspaceState, uri: &Uri, version: i32, content: &str) -> bool {
	let result = lex(&document_path(uri), content.as_bytes(), &state.options);
	state.store_document(uri, version, result)
}

/// A document outside any IB project, so includes stay ordinary tokens.
fn make_rootless_state(content: &str) -> (WorkspaceState, Uri) {
	let uri = file_uri(Path::new("/tmp/ib-tests/untitled.ib"));
	let mut state = WorkspaceState::default();
	lex_into(&mut state, &uri, 1, content);
	(state, uri)
}

/// A temporary IB project with `source/system` and the given files below
/// `source`.
fn make_project(files: &[(&str, &str)]) -> tempfile::TempDir {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	let source = tmp.path().join("source");
	std::fs::create_dir_all(source.join("system")).unwrap_or_else(|e| panic!("mkdir: {e}"));

	for (name, content) in files {
		std::fs::write(source.join(name), content).unwrap_or_else(|e| panic!("write: {e}"));
	}

	tmp
}

fn make_project_state(tmp: &tempfile::TempDir, content: &str) -> (WorkspaceState, Uri) {
	let uri = file_uri(&tmp.path().join("source").join("main.ib"));
	let mut state = WorkspaceState {
		root: Some(tmp.path().to_path_buf()),
		..WorkspaceState::default()
	};
	lex_into(&mut state, &uri, 1, content);
	(state, uri)
}

// ---- Diagnostics tests ----

#[test]
fn diagnostics_missing_include() {
	let tmp = make_project(&[]);
	let (state, uri) = make_project_state(&tmp, "start\r\n  include \"nope\"\r\n");

	let diagnostics = compute_diagnostics(&state, &uri);

	assert_eq!(diagnostics.len(), 1);
	assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::WARNING));
	assert_eq!(
		diagnostics[0].code,
		Some(NumberOrString::String("ib::include_not_found".to_string()))
	);
	assert_eq!(diagnostics[0].source.as_deref(), Some("ib"));
	assert_eq!(
		diagnostics[0].range,
		Range {
			start: Position { line: 1, character: 2 },
			end: Position { line: 1, character: 9 },
		}
	);
	assert!(
		diagnostics[0].message.contains("nope.ib"),
		"expected the resolved path in message: {}",
		diagnostics[0].message
	);
}

#[test]
fn diagnostics_resolved_include() {
	let tmp = make_project(&[("child.ib", "alpha")]);
	let (state, uri) = make_project_state(&tmp, "include \"child\"");

	assert!(compute_diagnostics(&state, &uri).is_empty());
}

#[test]
fn diagnostics_only_for_own_directives() {
	let tmp = make_project(&[("child.ib", "include \"missing\"")]);
	let (state, uri) = make_project_state(&tmp, "include \"child\"");

	assert!(compute_diagnostics(&state, &uri).is_empty());
}

#[test]
fn diagnostics_include_cycle() {
	let tmp = make_project(&[("main.ib", "include \"main\"")]);
	let (state, uri) = make_project_state(&tmp, "include \"main\"");

	let diagnostics = compute_diagnostics(&state, &uri);
	assert_eq!(diagnostics.len(), 1);
	assert!(diagnostics[0].message.contains("include cycle"));
}

#[test]
fn diagnostics_capped_by_max_number_of_problems() {
	let tmp = make_project(&[]);
	let (mut state, uri) = make_project_state(
		&tmp,
		"include \"a\"\r\ninclude \"b\"\r\ninclude \"c\"\r\n",
	);

	assert_eq!(compute_diagnostics(&state, &uri).len(), 3);

	state.max_number_of_problems = 2;
	let diagnostics = compute_diagnostics(&state, &uri);
	assert_eq!(diagnostics.len(), 2);
	assert_eq!(diagnostics[1].range.start.line, 1);
}

#[test]
fn diagnostics_without_root() {
	let (state, uri) = make_rootless_state("include \"nope\"");
	assert!(compute_diagnostics(&state, &uri).is_empty());
}

#[test]
fn diagnostics_unknown_document() {
	let state = WorkspaceState::default();
	let uri = file_uri(Path::new("/tmp/ib-tests/closed.ib"));
	assert!(compute_diagnostics(&state, &uri).is_empty());
}

// ---- Settings tests ----

#[rstest]
#[case::section(serde_json::json!({ "ib": { "maxNumberOfProblems": 5 } }), 5)]
#[case::flat(serde_json::json!({ "maxNumberOfProblems": 7 }), 7)]
#[case::wrong_type(serde_json::json!({ "ib": { "maxNumberOfProblems": "ten" } }), DEFAULT_MAX_NUMBER_OF_PROBLEMS)]
#[case::missing(serde_json::json!({ "ib": {} }), DEFAULT_MAX_NUMBER_OF_PROBLEMS)]
#[case::null(serde_json::Value::Null, DEFAULT_MAX_NUMBER_OF_PROBLEMS)]
fn applies_settings(#[case] settings: serde_json::Value, #[case] expected: usize) {
	let mut state = WorkspaceState::default();
	state.apply_settings(&settings);
	assert_eq!(state.max_number_of_problems, expected);
}

#[test]
fn loads_config_from_workspace_root() {
	let tmp = make_project(&[("defs.inc", "D")]);
	std::fs::write(tmp.path().join("ib.toml"), "default_extension = \"inc\"")
		.unwrap_or_else(|e| panic!("write: {e}"));

	let mut state = WorkspaceState {
		root: Some(tmp.path().to_path_buf()),
		..WorkspaceState::default()
	};
	state.load_config();
	assert_eq!(state.options.default_extension, "inc");

	let uri = file_uri(&tmp.path().join("source").join("main.ib"));
	lex_into(&mut state, &uri, 1, "include \"defs\"");
	let doc = state.documents.get(&uri).unwrap();
	assert_eq!(doc.result.tokens.len(), 1);
}

// ---- Hover tests ----

#[test]
fn hover_on_token() {
	let (state, uri) = make_rootless_state("alpha, beta");

	let hover = compute_hover(&state, &uri, Position { line: 0, character: 8 });
	let Some(hover) = hover else {
		panic!("expected hover on `beta`");
	};

	let HoverContents::Markup(markup) = &hover.contents else {
		panic!("expected markup hover contents");
	};
	assert!(markup.value.contains("**Token:** `beta`"), "{}", markup.value);
	assert!(markup.value.contains("line 1, column 8"), "{}", markup.value);
	assert!(
		markup.value.contains("**Leading delimiter:** `,`"),
		"{}",
		markup.value
	);
	assert_eq!(
		hover.range,
		Some(Range {
			start: Position { line: 0, character: 7 },
			end: Position { line: 0, character: 11 },
		})
	);
}

#[test]
fn hover_on_first_token_has_no_delimiter() {
	let (state, uri) = make_rootless_state("alpha");

	let hover = compute_hover(&state, &uri, Position { line: 0, character: 0 });
	let Some(Hover {
		contents: HoverContents::Markup(markup),
		..
	}) = hover
	else {
		panic!("expected markup hover on `alpha`");
	};

	assert!(markup.value.contains("**Leading delimiter:** none"));
}

#[test]
fn hover_names_keywords() {
	let (state, uri) = make_rootless_state("x\nLibrary y");

	let hover = compute_hover(&state, &uri, Position { line: 1, character: 3 });
	let Some(Hover {
		contents: HoverContents::Markup(markup),
		..
	}) = hover
	else {
		panic!("expected markup hover on `Library`");
	};

	assert!(markup.value.contains("(keyword `library`)"), "{}", markup.value);
}

#[rstest]
#[case::delimiter(Position { line: 0, character: 5 })]
#[case::past_end(Position { line: 0, character: 40 })]
#[case::next_line(Position { line: 3, character: 0 })]
#[case::inside_comment(Position { line: 0, character: 16 })]
fn hover_outside_tokens(#[case] position: Position) {
	let (state, uri) = make_rootless_state("alpha, beta ; hidden");
	assert!(compute_hover(&state, &uri, position).is_none());
}

// ---- Completion tests ----

#[test]
fn completions_keywords_then_identifiers() {
	let (state, uri) = make_rootless_state("module Foo bar\r\nFoo MODULE baz");

	let items = compute_completions(&state, &uri);
	let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();

	assert_eq!(
		labels,
		vec![
			"comment",
			"endcomment",
			"module",
			"library",
			"include",
			"Foo",
			"bar",
			"baz",
		]
	);
	assert_eq!(items[0].kind, Some(CompletionItemKind::KEYWORD));
	assert_eq!(items[5].kind, Some(CompletionItemKind::TEXT));
}

#[test]
fn completions_include_included_identifiers() {
	let tmp = make_project(&[("child.ib", "shared")]);
	let (state, uri) = make_project_state(&tmp, "local include \"child\"");

	let items = compute_completions(&state, &uri);
	let identifiers: Vec<(&str, Option<&str>)> = items
		.iter()
		.skip(Keyword::ALL.len())
		.map(|item| (item.label.as_str(), item.detail.as_deref()))
		.collect();

	assert_eq!(
		identifiers,
		vec![("local", None), ("shared", Some("included"))]
	);
}

#[test]
fn completions_unknown_document() {
	let state = WorkspaceState::default();
	let uri = file_uri(Path::new("/tmp/ib-tests/closed.ib"));
	assert!(compute_completions(&state, &uri).is_empty());
}

// ---- Document lifecycle tests ----

#[test]
fn relexing_replaces_previous_result() {
	let (mut state, uri) = make_rootless_state("one two");
	assert!(lex_into(&mut state, &uri, 2, "three"));

	let doc = state.documents.get(&uri).unwrap();
	let texts: Vec<&str> = doc.result.tokens.iter().map(|t| t.text.as_str()).collect();
	assert_eq!(texts, vec!["three"]);
	assert_eq!(state.documents.len(), 1);
}

#[test]
fn older_versions_do_not_replace_newer_results() {
	let (mut state, uri) = make_rootless_state("first");
	assert!(lex_into(&mut state, &uri, 3, "third"));
	assert!(!lex_into(&mut state, &uri, 2, "second"));

	let doc = state.documents.get(&uri).unwrap();
	assert_eq!(doc.version, 3);
	assert_eq!(doc.result.tokens[0].text, "third");
}

#[test]
fn reopened_documents_start_fresh() {
	let (mut state, uri) = make_rootless_state("first");
	assert!(lex_into(&mut state, &uri, 5, "later"));

	state.documents.remove(&uri);
	assert!(lex_into(&mut state, &uri, 1, "again"));
	assert_eq!(state.documents.get(&uri).unwrap().result.tokens[0].text, "again");
}

#[test]
fn untitled_documents_have_no_root() {
	let uri = "untitled:Untitled-1"
		.parse::<Uri>()
		.unwrap_or_else(|_| panic!("invalid test URI"));
	let mut state = WorkspaceState::default();
	lex_into(&mut state, &uri, 1, "include \"x\"");

	let doc = state.documents.get(&uri).unwrap();
	assert_eq!(doc.result.root, None);
	assert_eq!(doc.result.tokens.len(), 2);
}
