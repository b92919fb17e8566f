use super::{Dispatcher, STATUS_ERROR, STATUS_OK};
use crate::options::CommandOptions;
use crate::output::{Formattable, OutputFormat, format_output};
use libstevedore::format::{format_size, format_timestamp};
use libstevedore::store::ImageSummary;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Images in the local repository, ready for display.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ImageListing(Vec<ImageSummary>);

#[derive(Debug, Tabled)]
struct ImageRow {
    #[tabled(rename = "REPOSITORY")]
    repository: String,
    #[tabled(rename = "TAG")]
    tag: String,
    #[tabled(rename = "LAYERS")]
    layers: usize,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "CREATED")]
    created: String,
}

impl Formattable for ImageListing {
    fn format_pretty(&self) -> String {
        if self.0.is_empty() {
            return "No images found.".to_string();
        }

        let rows: Vec<ImageRow> = self
            .0
            .iter()
            .map(|image| ImageRow {
                repository: image.reference.repository().to_string(),
                tag: image.reference.tag().to_string(),
                layers: image.layers,
                size: format_size(image.size),
                created: format_timestamp(&image.created),
            })
            .collect();
        Table::new(rows).with(Style::empty()).to_string()
    }
}

impl Dispatcher {
    /// `images [--format pretty|json|yaml]`
    pub(super) fn images(&mut self, options: &CommandOptions) -> i32 {
        let format = options
            .get("format")
            .map(OutputFormat::from)
            .unwrap_or_default();

        let listing = ImageListing(self.store.list_images());
        match format_output(&listing, format) {
            Ok(output) => {
                self.sink.info(output.trim_end());
                STATUS_OK
            }
            Err(e) => {
                self.sink.error(&e);
                STATUS_ERROR
            }
        }
    }
}
