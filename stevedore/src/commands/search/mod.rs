//! `search`: paginated registry search.

use super::{Dispatcher, STATUS_ERROR, STATUS_OK};
use crate::options::CommandOptions;
use crate::output::MessageSink;
use crate::terminal::Terminal;
use libstevedore::registry::{RegistryClient, SearchHit, SearchPage};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::debug;

#[cfg(test)]
mod tests;

const MORE_PROMPT: &str = "[press return for more, q to quit] ";
const DESCRIPTION_WIDTH: usize = 45;

/// Renders search pages in the shape they arrived in.
pub trait PageRenderer {
    fn render_v1(&mut self, results: &[SearchHit]);
    fn render_v2(&mut self, repositories: &[String]);
}

/// Renderer writing pages to a message sink.
pub struct SinkRenderer<'a> {
    sink: &'a dyn MessageSink,
}

impl<'a> SinkRenderer<'a> {
    pub fn new(sink: &'a dyn MessageSink) -> Self {
        Self { sink }
    }
}

#[derive(Debug, Tabled)]
struct SearchRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "OFFICIAL")]
    official: &'static str,
    #[tabled(rename = "STARS")]
    stars: u64,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

impl From<&SearchHit> for SearchRow {
    fn from(hit: &SearchHit) -> Self {
        Self {
            name: hit.name.clone(),
            official: if hit.is_official { "[OK]" } else { "----" },
            stars: hit.stars,
            description: truncate(&hit.description, DESCRIPTION_WIDTH),
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    let text = text.replace(['\n', '\r'], " ");
    if text.chars().count() <= width {
        return text;
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

impl PageRenderer for SinkRenderer<'_> {
    fn render_v1(&mut self, results: &[SearchHit]) {
        if results.is_empty() {
            return;
        }
        let rows: Vec<SearchRow> = results.iter().map(SearchRow::from).collect();
        let table = Table::new(rows).with(Style::empty()).to_string();
        self.sink.info(&table);
    }

    fn render_v2(&mut self, repositories: &[String]) {
        for name in repositories {
            self.sink.info(name);
        }
    }
}

/// Walks search pages one at a time, pausing between pages unless running
/// in batch mode.
#[derive(Debug, Clone)]
pub struct SearchPaginator<'a> {
    term: &'a str,
    batch: bool,
}

impl<'a> SearchPaginator<'a> {
    pub fn new(term: &'a str, batch: bool) -> Self {
        Self { term, batch }
    }

    /// Runs the search to completion. Always returns [`STATUS_OK`]: a page
    /// that fails to arrive ends the search early without failing it.
    pub fn run(
        &self,
        registry: &mut dyn RegistryClient,
        terminal: &mut dyn Terminal,
        renderer: &mut dyn PageRenderer,
    ) -> i32 {
        let mut page_idx = 0;
        loop {
            let Some(page) = registry.search_get_page(self.term, page_idx) else {
                debug!(term = self.term, page_idx, "no page, ending search");
                return STATUS_OK;
            };

            match &page {
                SearchPage::V1 { results } => renderer.render_v1(results),
                SearchPage::V2 { repositories } => renderer.render_v2(repositories),
                SearchPage::Unrecognized => {
                    debug!(term = self.term, page_idx, "skipping unrecognized page")
                }
            }

            if registry.search_ended() {
                return STATUS_OK;
            }
            if !self.batch && !terminal.confirm(MORE_PROMPT) {
                debug!(term = self.term, page_idx, "search stopped by user");
                return STATUS_OK;
            }
            page_idx += 1;
        }
    }
}

impl Dispatcher {
    /// `search <expression> [--all]`
    pub(super) fn search(&mut self, options: &CommandOptions) -> i32 {
        if !self.require(options, &["expression"]) {
            return STATUS_ERROR;
        }

        let term = options.get("expression").unwrap_or_default().trim();
        let paginator = SearchPaginator::new(term, options.flag("all"));
        let mut renderer = SinkRenderer::new(self.sink.as_ref());
        paginator.run(
            self.registry.as_mut(),
            self.terminal.as_mut(),
            &mut renderer,
        )
    }
}
