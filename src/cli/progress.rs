//! Terminal progress feedback
//!
//! A spinner while the catalogue is crawled and a bar over the files of a
//! download batch. Both stay hidden in quiet mode or when stderr is not a
//! terminal.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::app::catalogue::builder::CrawlProgress;
use crate::app::orchestrator::{ItemOutcome, ItemProgress};

fn enabled(quiet: bool) -> bool {
    !quiet && atty::is(atty::Stream::Stderr)
}

/// Spinner reporting the region currently crawled
pub fn crawl_spinner(quiet: bool) -> ProgressBar {
    if !enabled(quiet) {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["◐", "◓", "◑", "◒", "●"]),
    );
    spinner
}

/// Crawl callback driving `spinner`
pub fn crawl_progress(spinner: ProgressBar) -> CrawlProgress {
    Arc::new(move |region: &str, remaining: usize| {
        if spinner.is_hidden() {
            return;
        }
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(format!("Crawling {} ({} pages queued)", region, remaining));
    })
}

/// Bar over the planned files of a batch
pub fn batch_bar(total: usize, quiet: bool) -> ProgressBar {
    if !enabled(quiet) {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Item callback advancing `bar`
pub fn item_progress(bar: ProgressBar) -> ItemProgress {
    Arc::new(move |outcome: &ItemOutcome| {
        bar.set_message(format!("{} ({})", outcome.region, outcome.status.label()));
        bar.inc(1);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_mode_is_hidden() {
        assert!(crawl_spinner(true).is_hidden());
        assert!(batch_bar(3, true).is_hidden());
    }

    #[test]
    fn test_crawl_progress_on_hidden_spinner() {
        let spinner = ProgressBar::hidden();
        let progress = crawl_progress(spinner.clone());
        progress("Europe", 12);
        assert!(spinner.message().is_empty());
    }
}
