use super::*;
use crate::output::{MemorySink, Severity};
use std::collections::VecDeque;
use std::io;

struct ScriptedRegistry {
    pages: Vec<Option<SearchPage>>,
    requested: Vec<usize>,
}

impl ScriptedRegistry {
    fn new(pages: Vec<Option<SearchPage>>) -> Self {
        Self {
            pages,
            requested: Vec::new(),
        }
    }
}

impl RegistryClient for ScriptedRegistry {
    fn search_get_page(&mut self, _term: &str, page_idx: usize) -> Option<SearchPage> {
        self.requested.push(page_idx);
        self.pages.get(page_idx).cloned().flatten()
    }

    fn search_ended(&self) -> bool {
        self.requested.len() >= self.pages.len()
    }

    fn is_repo_name(&self, _name: &str) -> bool {
        true
    }
}

struct ScriptedTerminal {
    answers: VecDeque<bool>,
    prompts: usize,
}

impl ScriptedTerminal {
    fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            prompts: 0,
        }
    }
}

impl Terminal for ScriptedTerminal {
    fn read_line(&mut self, _prompt: &str) -> io::Result<String> {
        unreachable!("search only confirms")
    }

    fn read_secret(&mut self, _prompt: &str) -> io::Result<String> {
        unreachable!("search only confirms")
    }

    fn confirm(&mut self, _prompt: &str) -> bool {
        self.prompts += 1;
        self.answers.pop_front().unwrap_or(false)
    }
}

#[derive(Default)]
struct RecordingRenderer {
    v1_calls: usize,
    v2_calls: usize,
    names: Vec<String>,
}

impl PageRenderer for RecordingRenderer {
    fn render_v1(&mut self, results: &[SearchHit]) {
        self.v1_calls += 1;
        self.names.extend(results.iter().map(|hit| hit.name.clone()));
    }

    fn render_v2(&mut self, repositories: &[String]) {
        self.v2_calls += 1;
        self.names.extend(repositories.iter().cloned());
    }
}

fn v1(names: &[&str]) -> Option<SearchPage> {
    Some(SearchPage::V1 {
        results: names
            .iter()
            .map(|name| SearchHit {
                name: name.to_string(),
                description: String::new(),
                stars: 0,
                is_official: false,
                is_automated: false,
            })
            .collect(),
    })
}

fn v2(names: &[&str]) -> Option<SearchPage> {
    Some(SearchPage::V2 {
        repositories: names.iter().map(|name| name.to_string()).collect(),
    })
}

#[test]
fn test_mixed_pages_invoke_both_renderers() {
    let mut registry = ScriptedRegistry::new(vec![
        v1(&["alpine"]),
        v2(&["alpine/git"]),
        Some(SearchPage::Unrecognized),
    ]);
    let mut terminal = ScriptedTerminal::answering(&[]);
    let mut renderer = RecordingRenderer::default();

    let status = SearchPaginator::new("alpine", true).run(&mut registry, &mut terminal, &mut renderer);

    assert_eq!(status, STATUS_OK);
    assert_eq!(renderer.v1_calls, 1);
    assert_eq!(renderer.v2_calls, 1);
    assert_eq!(registry.requested, vec![0, 1, 2]);
    assert_eq!(terminal.prompts, 0);
}

#[test]
fn test_unrecognized_first_page_does_not_trigger_v1() {
    let mut registry = ScriptedRegistry::new(vec![
        Some(SearchPage::Unrecognized),
        v2(&["a"]),
        v2(&["b"]),
    ]);
    let mut terminal = ScriptedTerminal::answering(&[]);
    let mut renderer = RecordingRenderer::default();

    SearchPaginator::new("x", true).run(&mut registry, &mut terminal, &mut renderer);

    assert_eq!(renderer.v1_calls, 0);
    assert_eq!(renderer.v2_calls, 2);
    assert_eq!(renderer.names, vec!["a", "b"]);
}

#[test]
fn test_none_page_ends_search_with_success() {
    let mut registry = ScriptedRegistry::new(vec![v2(&["a"]), None, v2(&["never"])]);
    let mut terminal = ScriptedTerminal::answering(&[]);
    let mut renderer = RecordingRenderer::default();

    let status = SearchPaginator::new("x", true).run(&mut registry, &mut terminal, &mut renderer);

    assert_eq!(status, STATUS_OK);
    assert_eq!(registry.requested, vec![0, 1]);
    assert_eq!(renderer.names, vec!["a"]);
}

#[test]
fn test_interactive_mode_prompts_between_pages() {
    let mut registry = ScriptedRegistry::new(vec![v2(&["a"]), v2(&["b"]), v2(&["c"])]);
    let mut terminal = ScriptedTerminal::answering(&[true, false]);
    let mut renderer = RecordingRenderer::default();

    let status = SearchPaginator::new("x", false).run(&mut registry, &mut terminal, &mut renderer);

    assert_eq!(status, STATUS_OK);
    assert_eq!(terminal.prompts, 2);
    assert_eq!(renderer.names, vec!["a", "b"]);
    assert_eq!(registry.requested, vec![0, 1]);
}

#[test]
fn test_last_page_does_not_prompt() {
    let mut registry = ScriptedRegistry::new(vec![v2(&["only"])]);
    let mut terminal = ScriptedTerminal::answering(&[true]);
    let mut renderer = RecordingRenderer::default();

    SearchPaginator::new("x", false).run(&mut registry, &mut terminal, &mut renderer);

    assert_eq!(terminal.prompts, 0);
}

#[test]
fn test_sink_renderer_v1_table() {
    let sink = MemorySink::new();
    let mut renderer = SinkRenderer::new(&sink);

    renderer.render_v1(&[SearchHit {
        name: "nginx".to_string(),
        description: "Official build of Nginx.".to_string(),
        stars: 20000,
        is_official: true,
        is_automated: false,
    }]);

    let output = sink.at(Severity::Info);
    assert_eq!(output.len(), 1);
    assert!(output[0].contains("OFFICIAL"));
    assert!(output[0].contains("[OK]"));
    assert!(output[0].contains("20000"));
}

#[test]
fn test_sink_renderer_skips_empty_v1_page() {
    let sink = MemorySink::new();
    SinkRenderer::new(&sink).render_v1(&[]);
    assert!(sink.messages().is_empty());
}

#[test]
fn test_sink_renderer_v2_one_name_per_line() {
    let sink = MemorySink::new();
    SinkRenderer::new(&sink).render_v2(&["a".to_string(), "b/c".to_string()]);
    assert_eq!(sink.at(Severity::Info), vec!["a", "b/c"]);
}

#[test]
fn test_truncate_long_description() {
    let long = "x".repeat(60);
    let cut = truncate(&long, 10);
    assert_eq!(cut, "xxxxxxx...");
    assert_eq!(truncate("short\ntext", 45), "short text");
}
