//! Media RSS serialization.
//!
//! Renders a [`FeedDocument`] as an RSS 2.0 document carrying the Media RSS
//! (`media:`), YouTube (`yt:`), Dublin Core (`dc:`), and Atom extension
//! namespaces. Every text and attribute value goes through the writer's
//! escaping; the item description additionally embeds a pre-escaped HTML
//! fragment, so its text ends up entity-encoded twice. Downstream consumers
//! rely on that double-encoded form; see [`description_fragment`].

use std::io::Cursor;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::feed::{ContentKind, Entry, FeedDocument};

/// Emitted verbatim as the first line, ahead of the writer-produced body,
/// so the declaration text stays fixed no matter how the body is built.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

const NS_ATOM: &str = "http://www.w3.org/2005/Atom";
const NS_MEDIA: &str = "http://search.yahoo.com/mrss/";
const NS_YT: &str = "http://www.youtube.com/xml/schemas/2015";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";

/// RSS 2.0 date format (RFC 822 with a four-digit year), always UTC.
pub fn format_rfc822(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

/// Serializes the document. Output is deterministic: the same document (and
/// the same build date) always yields byte-identical text.
pub fn render(doc: &FeedDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", NS_ATOM));
    rss.push_attribute(("xmlns:media", NS_MEDIA));
    rss.push_attribute(("xmlns:yt", NS_YT));
    rss.push_attribute(("xmlns:dc", NS_DC));
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;

    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    text_element(&mut writer, "title", &doc.title)?;
    text_element(&mut writer, "link", &doc.link)?;
    text_element(&mut writer, "description", &doc.description)?;
    text_element(&mut writer, "language", "en-us")?;
    text_element(&mut writer, "lastBuildDate", &format_rfc822(doc.build_date))?;
    text_element(&mut writer, "generator", &doc.generator)?;

    if let Some(self_url) = &doc.self_url {
        let mut link = BytesStart::new("atom:link");
        link.push_attribute(("href", self_url.as_str()));
        link.push_attribute(("rel", "self"));
        link.push_attribute(("type", "application/rss+xml"));
        writer.write_event(Event::Empty(link))?;
    }

    if let Some(image_url) = &doc.image_url {
        writer.write_event(Event::Start(BytesStart::new("image")))?;
        text_element(&mut writer, "url", image_url)?;
        text_element(&mut writer, "title", &doc.title)?;
        text_element(&mut writer, "link", &doc.link)?;
        writer.write_event(Event::End(BytesEnd::new("image")))?;
    }

    for entry in &doc.entries {
        write_item(&mut writer, entry)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let body = String::from_utf8(writer.into_inner().into_inner())
        .context("Generated feed contains invalid UTF-8")?;
    Ok(format!("{XML_DECLARATION}\n{body}"))
}

fn write_item(writer: &mut Writer<Cursor<Vec<u8>>>, entry: &Entry) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .context("Failed to write item element")?;

    text_element(writer, "title", &entry.title)?;
    text_element(writer, "link", &entry.link)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "true"));
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::new(&entry.link)))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    text_element(writer, "pubDate", &format_rfc822(entry.published))?;
    text_element(writer, "dc:creator", &entry.author)?;
    text_element(writer, "description", &description_fragment(entry))?;

    if let Some(thumbnail) = &entry.thumbnail_url {
        let mut thumb = BytesStart::new("media:thumbnail");
        thumb.push_attribute(("url", thumbnail.as_str()));
        writer.write_event(Event::Empty(thumb))?;
    }

    if let Some(video_id) = &entry.video_id {
        if let Some(embed_url) = &entry.embed_url {
            let mut content = BytesStart::new("media:content");
            content.push_attribute(("url", embed_url.as_str()));
            content.push_attribute(("type", "application/x-shockwave-flash"));
            content.push_attribute(("medium", "video"));
            writer.write_event(Event::Empty(content))?;
        }
        text_element(writer, "yt:videoId", video_id)?;
    }

    if let Some(channel_id) = &entry.channel_id {
        text_element(writer, "yt:channelId", channel_id)?;
    }

    text_element(writer, "category", &entry.channel_name)?;
    text_element(writer, "category", entry.kind.as_str())?;

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .context("Failed to write item end")?;
    Ok(())
}

/// The item description: an HTML fragment with the thumbnail (when there is
/// one), the entry text, and a link back to the source.
///
/// The entry text and the image alt are escaped here, and the whole fragment
/// is escaped again when written as the description's text content. The
/// double encoding is the published format of this feed; consumers unescape
/// the fragment once and receive HTML whose text is still entity-encoded,
/// exactly as earlier revisions of the feed emitted it. Do not collapse the
/// two passes into one.
fn description_fragment(entry: &Entry) -> String {
    let mut lines = Vec::with_capacity(3);

    if let Some(thumbnail) = &entry.thumbnail_url {
        lines.push(format!(
            r#"<p><img src="{}" alt="{}" /></p>"#,
            thumbnail,
            escape(entry.title.as_str())
        ));
    }

    lines.push(format!("<p>{}</p>", escape(entry.description.as_str())));

    let label = match entry.kind {
        ContentKind::Video => "Watch on YouTube",
        ContentKind::Article | ContentKind::Podcast => "Read more",
    };
    lines.push(format!(r#"<p><a href="{}">{}</a></p>"#, entry.link, label));

    lines.join("\n")
}

fn text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, value: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn video_entry() -> Entry {
        Entry {
            title: "V1".to_string(),
            link: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            video_id: Some("dQw4w9WgXcQ".to_string()),
            description: "A video".to_string(),
            published: Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap(),
            author: "Main Channel".to_string(),
            channel_name: "Main Channel".to_string(),
            channel_id: Some("UCwtGQ3sgidNlQGbIUBPP3xw".to_string()),
            thumbnail_url: Some(
                "https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg".to_string(),
            ),
            embed_url: Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string()),
            kind: ContentKind::Video,
        }
    }

    fn article_entry() -> Entry {
        Entry {
            title: "A2".to_string(),
            link: "https://example.org/a2".to_string(),
            video_id: None,
            description: "An article".to_string(),
            published: Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap(),
            author: "Site Articles".to_string(),
            channel_name: "Site Articles".to_string(),
            channel_id: None,
            thumbnail_url: None,
            embed_url: None,
            kind: ContentKind::Article,
        }
    }

    fn doc(entries: Vec<Entry>) -> FeedDocument {
        FeedDocument {
            title: "Club Video Feed".to_string(),
            link: "https://example.org".to_string(),
            description: "Combined feed".to_string(),
            self_url: None,
            image_url: None,
            generator: "feedmux test".to_string(),
            build_date: Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap(),
            entries,
        }
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_format_rfc822() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        assert_eq!(format_rfc822(dt), "Wed, 03 Jan 2024 10:00:00 +0000");
    }

    #[test]
    fn test_declaration_is_first_line() {
        let xml = render(&doc(vec![])).unwrap();
        let first_line = xml.lines().next().unwrap();
        assert_eq!(first_line, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    }

    #[test]
    fn test_empty_document_is_complete() {
        let xml = render(&doc(vec![])).unwrap();
        assert!(xml.contains(r#"<rss version="2.0""#));
        assert!(xml.contains("<channel>"));
        assert!(xml.contains("<language>en-us</language>"));
        assert!(xml.contains("<lastBuildDate>Thu, 04 Jan 2024 00:00:00 +0000</lastBuildDate>"));
        assert!(xml.contains("<generator>feedmux test</generator>"));
        assert_eq!(count(&xml, "<item>"), 0);
        assert!(xml.contains("</rss>"));
    }

    #[test]
    fn test_namespace_declarations_present() {
        let xml = render(&doc(vec![])).unwrap();
        assert!(xml.contains(r#"xmlns:atom="http://www.w3.org/2005/Atom""#));
        assert!(xml.contains(r#"xmlns:media="http://search.yahoo.com/mrss/""#));
        assert!(xml.contains(r#"xmlns:yt="http://www.youtube.com/xml/schemas/2015""#));
        assert!(xml.contains(r#"xmlns:dc="http://purl.org/dc/elements/1.1/""#));
    }

    #[test]
    fn test_self_link_only_when_configured() {
        let mut d = doc(vec![]);
        assert!(!render(&d).unwrap().contains("<atom:link"));

        d.self_url = Some("https://example.org/feeds/videos.xml".to_string());
        let xml = render(&d).unwrap();
        assert!(xml.contains(
            r#"<atom:link href="https://example.org/feeds/videos.xml" rel="self" type="application/rss+xml"/>"#
        ));
    }

    #[test]
    fn test_channel_image_only_when_configured() {
        let mut d = doc(vec![]);
        assert!(!render(&d).unwrap().contains("<image>"));

        d.image_url = Some("https://example.org/logo.svg".to_string());
        let xml = render(&d).unwrap();
        assert!(xml.contains("<image>"));
        assert!(xml.contains("<url>https://example.org/logo.svg</url>"));
    }

    #[test]
    fn test_video_item_markup() {
        let xml = render(&doc(vec![video_entry()])).unwrap();

        assert_eq!(count(&xml, "<item>"), 1);
        assert!(xml.contains("<title>V1</title>"));
        assert!(xml.contains(r#"<guid isPermaLink="true">"#));
        assert!(xml.contains("<pubDate>Wed, 03 Jan 2024 10:00:00 +0000</pubDate>"));
        assert!(xml.contains("<dc:creator>Main Channel</dc:creator>"));
        assert_eq!(count(&xml, "<yt:videoId>"), 1);
        assert!(xml.contains("<yt:videoId>dQw4w9WgXcQ</yt:videoId>"));
        assert_eq!(count(&xml, "<media:content "), 1);
        assert!(xml.contains(
            r#"<media:content url="https://www.youtube.com/embed/dQw4w9WgXcQ" type="application/x-shockwave-flash" medium="video"/>"#
        ));
        assert!(xml.contains("<yt:channelId>UCwtGQ3sgidNlQGbIUBPP3xw</yt:channelId>"));
        assert!(xml.contains(
            r#"<media:thumbnail url="https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"/>"#
        ));
        assert!(xml.contains("<category>Main Channel</category>"));
        assert!(xml.contains("<category>video</category>"));
    }

    #[test]
    fn test_video_without_id_omits_video_markup() {
        let mut entry = video_entry();
        entry.video_id = None;
        entry.embed_url = None;
        entry.thumbnail_url = None;

        let xml = render(&doc(vec![entry])).unwrap();
        assert_eq!(count(&xml, "<yt:videoId>"), 0);
        assert_eq!(count(&xml, "<media:content "), 0);
        assert_eq!(count(&xml, "<media:thumbnail "), 0);
        // Still categorized as video and still linking out to YouTube
        assert!(xml.contains("<category>video</category>"));
        assert!(xml.contains("Watch on YouTube"));
    }

    #[test]
    fn test_article_item_has_no_video_markup() {
        let xml = render(&doc(vec![article_entry()])).unwrap();
        assert_eq!(count(&xml, "<yt:videoId>"), 0);
        assert_eq!(count(&xml, "<media:content "), 0);
        assert_eq!(count(&xml, "<yt:channelId>"), 0);
        assert!(xml.contains("<category>article</category>"));
        assert!(xml.contains("Read more"));
    }

    #[test]
    fn test_title_escaped_once_per_item() {
        let mut entry = article_entry();
        entry.title = "Fish & Chips <review>".to_string();

        let xml = render(&doc(vec![entry])).unwrap();
        assert!(xml.contains("<title>Fish &amp; Chips &lt;review&gt;</title>"));
        // Channel title + item title only
        assert_eq!(count(&xml, "<title>"), 2);
    }

    #[test]
    fn test_description_text_is_double_escaped() {
        let mut entry = article_entry();
        entry.description = "Tom & Jerry <3".to_string();

        let xml = render(&doc(vec![entry])).unwrap();
        // First pass: "Tom &amp; Jerry &lt;3"; second pass while writing the
        // text node: "Tom &amp;amp; Jerry &amp;lt;3"
        assert!(xml.contains("Tom &amp;amp; Jerry &amp;lt;3"));
        assert!(!xml.contains("Tom &amp; Jerry <3"));
    }

    #[test]
    fn test_description_fragment_shape() {
        let entry = video_entry();
        let fragment = description_fragment(&entry);
        assert_eq!(
            fragment,
            "<p><img src=\"https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg\" alt=\"V1\" /></p>\n\
             <p>A video</p>\n\
             <p><a href=\"https://www.youtube.com/watch?v=dQw4w9WgXcQ\">Watch on YouTube</a></p>"
        );
    }

    #[test]
    fn test_description_fragment_without_thumbnail_skips_image() {
        let fragment = description_fragment(&article_entry());
        assert!(!fragment.contains("<img"));
        assert!(fragment.starts_with("<p>An article</p>"));
        assert!(fragment.contains(">Read more</a>"));
    }

    #[test]
    fn test_attribute_values_escaped() {
        let mut entry = article_entry();
        entry.thumbnail_url = Some("https://example.org/thumb.jpg?w=480&h=360".to_string());

        let xml = render(&doc(vec![entry])).unwrap();
        assert!(xml.contains(
            r#"<media:thumbnail url="https://example.org/thumb.jpg?w=480&amp;h=360"/>"#
        ));
    }

    #[test]
    fn test_items_rendered_in_given_order() {
        let xml = render(&doc(vec![video_entry(), article_entry()])).unwrap();
        let v1 = xml.find("<title>V1</title>").unwrap();
        let a2 = xml.find("<title>A2</title>").unwrap();
        assert!(v1 < a2);
    }

    #[test]
    fn test_render_is_idempotent() {
        let d = doc(vec![video_entry(), article_entry()]);
        let first = render(&d).unwrap();
        let second = render(&d).unwrap();
        assert_eq!(first, second);
    }
}
