//! Command-line interface definitions.
//!
//! Flags only choose where configuration is read from and where output is
//! written; everything that shapes the feed lives in the YAML config.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the news slideshow generator.
///
/// # Examples
///
/// ```sh
/// # Built-in Umag configuration, writes ./index.html
/// town_news_slides
///
/// # Custom sources, output into a web root, plus a JSON copy of the feed
/// town_news_slides -c novigrad.yaml -o /var/www/news/index.html -j /var/www/news/feed.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML source configuration (defaults to the built-in Umag config)
    #[arg(short, long, env = "TOWN_NEWS_CONFIG")]
    pub config: Option<String>,

    /// Where to write the slideshow HTML
    #[arg(short, long, default_value = "index.html")]
    pub output: PathBuf,

    /// Optional path for a JSON copy of the feed
    #[arg(short, long)]
    pub json_output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["town_news_slides"]);
        assert_eq!(cli.output, PathBuf::from("index.html"));
        assert!(cli.json_output.is_none());
    }

    #[test]
    fn test_cli_long_flags() {
        let cli = Cli::parse_from([
            "town_news_slides",
            "--config",
            "./novigrad.yaml",
            "--output",
            "/tmp/news/index.html",
            "--json-output",
            "/tmp/news/feed.json",
        ]);

        assert_eq!(cli.config.as_deref(), Some("./novigrad.yaml"));
        assert_eq!(cli.output, PathBuf::from("/tmp/news/index.html"));
        assert_eq!(cli.json_output, Some(PathBuf::from("/tmp/news/feed.json")));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "town_news_slides",
            "-c",
            "umag.yaml",
            "-o",
            "out.html",
            "-j",
            "out.json",
        ]);

        assert_eq!(cli.config.as_deref(), Some("umag.yaml"));
        assert_eq!(cli.output, PathBuf::from("out.html"));
        assert_eq!(cli.json_output, Some(PathBuf::from("out.json")));
    }
}
