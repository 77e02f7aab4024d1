//! Terminal and JSON output for an [`EpisodeView`].
//!
//! Episode descriptions arrive as HTML from the API. They are escaped or reduced to
//! plain text unless the caller opts into [`DescriptionPolicy::Trusted`].

use std::fmt::Write as _;

use serde_json::Value;

use crate::episode::EpisodeView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DescriptionPolicy {
    #[default]
    Escaped,
    Trusted,
}

impl DescriptionPolicy {
    pub fn from_trust_flag(trusted: bool) -> Self {
        if trusted {
            DescriptionPolicy::Trusted
        } else {
            DescriptionPolicy::Escaped
        }
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

const DESCRIPTION_WIDTH: usize = 100;

/// Plain text from description markup, wrapped to the terminal description width.
pub fn strip_markup(raw: &str) -> String {
    let text = html2text::from_read(raw.as_bytes(), DESCRIPTION_WIDTH);

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_detail(view: &EpisodeView, policy: DescriptionPolicy) -> String {
    let mut out = String::new();
    let heading = format!("{} | Podcastr", view.title());
    let _ = writeln!(out, "{heading}");
    let _ = writeln!(out, "{}", "=".repeat(heading.chars().count()));

    let members = view.member_names();
    if !members.is_empty() {
        let _ = writeln!(out, "Members:   {}", members.join(", "));
    }
    let _ = writeln!(out, "Published: {}", view.published_at());
    let _ = writeln!(out, "Duration:  {}", view.duration_as_string());
    if !view.url().is_empty() {
        let _ = writeln!(out, "Audio:     {}", view.url());
    }
    if !view.thumbnail().is_empty() {
        let _ = writeln!(out, "Thumbnail: {}", view.thumbnail());
    }

    let description = match policy {
        DescriptionPolicy::Trusted => view.description().trim().to_string(),
        DescriptionPolicy::Escaped => strip_markup(view.description()),
    };
    if !description.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{description}");
    }
    out
}

/// View model as JSON. With [`DescriptionPolicy::Escaped`] the description is
/// HTML-escaped so downstream templates cannot inject markup from it.
pub fn render_json(view: &EpisodeView, policy: DescriptionPolicy) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(view)?;
    if policy == DescriptionPolicy::Escaped
        && let Some(description) = value.get_mut("description")
    {
        *description = Value::String(escape_html(view.description()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::{RawEpisode, RawFile, normalize};

    fn view_with_description(description: &str) -> EpisodeView {
        normalize(&RawEpisode {
            id: "ep-1".to_string(),
            title: "Como virar um dev".to_string(),
            thumbnail: "https://example.test/thumb.jpg".to_string(),
            members: "Diego Fernandes,  Tiago Luchtenberg ,".to_string(),
            published_at: Some("2021-01-03T10:00:00.000Z".into()),
            description: description.to_string(),
            file: RawFile {
                duration: Some(3725_u64.into()),
                url: "https://example.test/ep-1.m4a".to_string(),
            },
        })
        .expect("fixture normalizes")
    }

    #[test]
    fn escape_html_escapes_all_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn strip_markup_keeps_paragraph_structure() {
        let text = strip_markup("<p>First &amp; foremost</p><p>Second<br>line</p>");
        assert_eq!(text, "First & foremost\nSecond\nline");
    }

    #[test]
    fn strip_markup_keeps_bare_angle_brackets_as_text() {
        let text = strip_markup("<p>if a < b and c > d then</p>");
        assert_eq!(text, "if a < b and c > d then");
    }

    #[test]
    fn strip_markup_never_emits_tags() {
        let text = strip_markup(
            "<p>Hi</p><script type=\"text/javascript\">alert(1)</script><p>Bye</p>",
        );
        assert!(!text.contains("<script"), "{text}");
        assert!(!text.contains("<p>"), "{text}");
        assert!(text.starts_with("Hi"), "{text}");
        assert!(text.ends_with("Bye"), "{text}");
    }

    #[test]
    fn strip_markup_puts_list_items_on_their_own_lines() {
        let text = strip_markup("<ul><li>one</li><li>two</li></ul>");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "{text}");
        assert!(lines[0].ends_with("one"));
        assert!(lines[1].ends_with("two"));
    }

    #[test]
    fn detail_view_lists_fields_and_strips_description() {
        let view = view_with_description("<p>Hello <span>world</span></p>");
        let text = render_detail(&view, DescriptionPolicy::Escaped);

        assert!(text.starts_with("Como virar um dev | Podcastr\n"));
        assert!(text.contains("Members:   Diego Fernandes, Tiago Luchtenberg\n"));
        assert!(text.contains("Published: 3 Jan 21\n"));
        assert!(text.contains("Duration:  01:02:05\n"));
        assert!(text.contains("Audio:     https://example.test/ep-1.m4a\n"));
        assert!(text.ends_with("\nHello world\n"));
    }

    #[test]
    fn trusted_detail_view_keeps_markup() {
        let view = view_with_description("<p>Hello <strong>world</strong></p>");
        let text = render_detail(&view, DescriptionPolicy::Trusted);
        assert!(text.ends_with("\n<p>Hello <strong>world</strong></p>\n"));
    }

    #[test]
    fn escaped_json_never_contains_raw_script() {
        let view = view_with_description("<script>alert('x')</script>");
        let value = render_json(&view, DescriptionPolicy::Escaped).expect("serializes");

        let description = value["description"].as_str().expect("string description");
        assert!(!description.contains("<script"));
        assert_eq!(description, "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;");
        assert_eq!(value["durationAsString"], "01:02:05");
    }

    #[test]
    fn trusted_json_passes_description_through() {
        let view = view_with_description("<p>raw</p>");
        let value = render_json(&view, DescriptionPolicy::Trusted).expect("serializes");
        assert_eq!(value["description"], "<p>raw</p>");
    }

    #[test]
    fn trust_flag_maps_to_policy() {
        assert_eq!(DescriptionPolicy::from_trust_flag(true), DescriptionPolicy::Trusted);
        assert_eq!(DescriptionPolicy::from_trust_flag(false), DescriptionPolicy::Escaped);
    }
}
