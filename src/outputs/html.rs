//! Slideshow rendering.
//!
//! Turns a [`Feed`] into one static HTML document meant to run full-screen
//! on a display:
//!
//! - one slide per item (image, badge, time label, title, description);
//! - the first slide starts visible and the slides rotate forward, wrapping
//!   around; a single slide never rotates;
//! - the page reloads itself so a fresh run's output is picked up;
//! - images that fail to load fall back to the placeholder image.

use crate::config::FeedConfig;
use crate::models::{Feed, NewsItem};
use crate::utils::ensure_parent_dir;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const STYLE: &str = r#"
        body, html {
            margin: 0; padding: 0; width: 100%; height: 100%;
            background-color: black; color: white; font-family: 'Inter', sans-serif;
            overflow: hidden;
        }
        .slide {
            position: absolute; box-sizing: border-box; width: 100%; height: 100%;
            display: none; flex-direction: column; padding: 30px 40px;
        }
        .slide.active { display: flex; animation: fadeIn 0.8s ease-in; }
        .slide-header { display: flex; gap: 25px; align-items: center; margin-bottom: 20px; }
        .source-badge {
            border: 4px solid white; padding: 5px 20px; border-radius: 10px;
            font-weight: 900; font-size: 2.4rem; text-transform: uppercase; letter-spacing: 2px;
            line-height: 1;
        }
        .pub-time { font-family: 'JetBrains Mono', monospace; font-size: 2.4rem; font-weight: 700; }
        .slide-body {
            display: grid; grid-template-columns: 0.9fr 1.1fr; gap: 50px;
            align-items: start; height: 100%;
        }
        .image-side {
            width: 100%; height: 78vh; border-radius: 30px; overflow: hidden;
            border: 4px solid #333; box-shadow: 0 20px 60px rgba(0,0,0,0.8);
        }
        .image-side img { width: 100%; height: 100%; object-fit: cover; }
        .text-side { display: flex; flex-direction: column; }
        .title {
            font-size: 4.8rem; font-weight: 900; line-height: 1.05;
            text-transform: uppercase; letter-spacing: -2px; margin-bottom: 35px;
            text-shadow: 0 4px 15px rgba(0,0,0,0.5);
            display: -webkit-box; -webkit-line-clamp: 3; -webkit-box-orient: vertical; overflow: hidden;
        }
        .description {
            font-size: 3.0rem; color: #ccc; line-height: 1.35;
            display: -webkit-box; -webkit-line-clamp: 8; -webkit-box-orient: vertical; overflow: hidden;
        }
        @keyframes fadeIn { from { opacity: 0; } to { opacity: 1; } }
"#;

/// Render the complete slideshow document for `feed`.
///
/// # Arguments
///
/// * `feed` - Items to show, first item first
/// * `config` - Supplies the `render` section, page title and placeholder image
///
/// # Returns
///
/// The HTML document. Item text is escaped as element content and URLs as
/// double-quoted attribute values.
pub fn render_slideshow(feed: &Feed, config: &FeedConfig) -> String {
    let placeholder = config.placeholder_image();
    let slides: String = feed
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| render_slide(item, i == 0, &placeholder))
        .collect();

    // Bounded by `FeedConfig::validate`; saturate for configs built in code.
    let slide_ms = config.render.slide_interval_secs.saturating_mul(1000);
    let reload_ms = config.render.reload_interval_secs.saturating_mul(1000);

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
    <meta charset="UTF-8">
    <meta name="robots" content="noindex, nofollow">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link href="https://fonts.googleapis.com/css2?family=Inter:wght@800;900&family=JetBrains+Mono:wght@700&display=swap" rel="stylesheet">
    <style>{STYLE}    </style>
</head>
<body>
{slides}
    <script>
        const slides = document.querySelectorAll('.slide');
        let current = 0;
        function nextSlide() {{
            if (slides.length <= 1) return;
            slides[current].classList.remove('active');
            current = (current + 1) % slides.length;
            slides[current].classList.add('active');
        }}
        setInterval(nextSlide, {slide_ms});
        setTimeout(() => {{ location.reload(); }}, {reload_ms});
    </script>
</body>
</html>
"#,
        lang = attr(&config.render.lang),
        title = text(&config.page_title()),
    )
}

fn render_slide(item: &NewsItem, active: bool, placeholder: &str) -> String {
    let class = if active { "slide active" } else { "slide" };
    let badge = if item.category == item.source {
        text(&item.source).into_owned()
    } else {
        format!("{} · {}", text(&item.source), text(&item.category))
    };
    let description = if item.description.is_empty() {
        String::new()
    } else {
        format!(
            "\n                    <div class=\"description\">{}</div>",
            text(&item.description)
        )
    };

    format!(
        r#"    <div class="{class}">
        <div class="slide-header">
            <span class="source-badge">{badge}</span>
            <span class="pub-time">{time}</span>
        </div>
        <div class="slide-body">
            <div class="image-side">
                <img src="{src}" alt="" data-fallback="{fallback}" onerror="this.onerror=null;this.src=this.dataset.fallback;">
            </div>
            <div class="text-side">
                <div class="title">{title}</div>{description}
            </div>
        </div>
    </div>
"#,
        time = text(&item.display_time),
        src = attr(&item.image_url),
        fallback = attr(placeholder),
        title = text(&item.title),
    )
}

/// Overwrite `path` with the rendered document.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_slideshow(html: &str, path: &Path) -> Result<(), Box<dyn Error>> {
    ensure_parent_dir(path).await?;
    fs::write(path, html).await?;
    info!(bytes = html.len(), "Wrote slideshow");
    Ok(())
}
