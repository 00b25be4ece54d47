//! Render url-sets and the sitemap-index to spec-compliant XML.
//!
//! Output is written compactly (no indentation or inter-element whitespace),
//! which is the minified form the files ship in. Per-source url-sets may
//! carry a stylesheet processing instruction and may be gzip-compressed; the
//! sitemap-index never gets either.

use crate::config::Stylesheet;
use crate::sitemap::{Extensions, Image, IndexFile, News, UrlEntry, Video};
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

const SITEMAP_XMLNS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const VIDEO_XMLNS: &str = "http://www.google.com/schemas/sitemap-video/1.1";
const IMAGE_XMLNS: &str = "http://www.google.com/schemas/sitemap-image/1.1";
const NEWS_XMLNS: &str = "http://www.google.com/schemas/sitemap-news/0.9";

/// Render a url-set document for one source.
///
/// Extension namespaces are declared only for the block kinds the source's
/// field map configures. Entries are emitted in the order received.
pub fn render_urlset(
    entries: &[UrlEntry],
    extensions: Extensions,
    stylesheet: Option<Stylesheet>,
) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    if let Some(style) = stylesheet {
        let pi = format!(r#"xml-stylesheet type="text/xsl" href="{}""#, style.link());
        writer.write_event(Event::PI(BytesPI::new(pi.as_str())))?;
    }

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_XMLNS));
    if extensions.video {
        urlset.push_attribute(("xmlns:video", VIDEO_XMLNS));
    }
    if extensions.image {
        urlset.push_attribute(("xmlns:image", IMAGE_XMLNS));
    }
    if extensions.news {
        urlset.push_attribute(("xmlns:news", NEWS_XMLNS));
    }
    writer.write_event(Event::Start(urlset))?;

    for entry in entries {
        write_entry(&mut writer, entry)?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;

    Ok(writer.into_inner())
}

/// Render the sitemap-index document enumerating every generated file.
pub fn render_index(files: &[IndexFile]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("sitemapindex");
    root.push_attribute(("xmlns", SITEMAP_XMLNS));
    writer.write_event(Event::Start(root))?;

    for file in files {
        writer.write_event(Event::Start(BytesStart::new("sitemap")))?;
        write_text(&mut writer, "loc", &file.loc)?;
        write_text(&mut writer, "lastmod", &file.lastmod)?;
        writer.write_event(Event::End(BytesEnd::new("sitemap")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sitemapindex")))?;

    Ok(writer.into_inner())
}

/// Gzip rendered bytes for sources marked `compress`.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .context("failed to write to gzip encoder")?;
    encoder.finish().context("failed to finish gzip stream")
}

fn write_entry(writer: &mut Writer<Vec<u8>>, entry: &UrlEntry) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("url")))?;

    write_text(writer, "loc", &entry.loc)?;
    write_text(writer, "lastmod", &entry.lastmod)?;
    write_text(writer, "changefreq", entry.changefreq.as_str())?;
    write_text(writer, "priority", &entry.priority)?;

    if let Some(video) = &entry.video {
        write_video(writer, video)?;
    }
    if let Some(image) = &entry.image {
        write_image(writer, image)?;
    }
    if let Some(news) = &entry.news {
        write_news(writer, news)?;
    }

    writer.write_event(Event::End(BytesEnd::new("url")))?;
    Ok(())
}

fn write_video(writer: &mut Writer<Vec<u8>>, video: &Video) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("video:video")))?;

    write_opt(writer, "video:thumbnail_loc", &video.thumbnail_loc)?;
    write_opt(writer, "video:title", &video.title)?;
    write_opt(writer, "video:description", &video.description)?;
    write_opt(writer, "video:content_loc", &video.content_loc)?;

    if let Some(player_loc) = &video.player_loc {
        let mut start = BytesStart::new("video:player_loc");
        if let Some(autoplay) = &video.player_autoplay {
            start.push_attribute(("autoplay", autoplay.as_str()));
        }
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(player_loc)))?;
        writer.write_event(Event::End(BytesEnd::new("video:player_loc")))?;
    }

    write_opt(writer, "video:duration", &video.duration)?;
    write_opt(writer, "video:expiration_date", &video.expiration_date)?;
    write_opt(writer, "video:rating", &video.rating)?;
    write_opt(writer, "video:view_count", &video.view_count)?;
    write_opt(writer, "video:publication_date", &video.publication_date)?;
    write_opt(writer, "video:family_friendly", &video.family_friendly)?;

    if let Some(restriction) = &video.restriction {
        let mut start = BytesStart::new("video:restriction");
        if let Some(relationship) = &video.restriction_relationship {
            start.push_attribute(("relationship", relationship.as_str()));
        }
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(restriction)))?;
        writer.write_event(Event::End(BytesEnd::new("video:restriction")))?;
    }

    write_opt(writer, "video:requires_subscription", &video.requires_subscription)?;
    write_opt(writer, "video:live", &video.live)?;

    writer.write_event(Event::End(BytesEnd::new("video:video")))?;
    Ok(())
}

fn write_image(writer: &mut Writer<Vec<u8>>, image: &Image) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("image:image")))?;

    write_text(writer, "image:loc", &image.loc)?;
    write_opt(writer, "image:caption", &image.caption)?;
    write_opt(writer, "image:title", &image.title)?;
    write_opt(writer, "image:license", &image.license)?;
    write_opt(writer, "image:geo_location", &image.geo_location)?;

    writer.write_event(Event::End(BytesEnd::new("image:image")))?;
    Ok(())
}

fn write_news(writer: &mut Writer<Vec<u8>>, news: &News) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("news:news")))?;

    if let Some(publication) = &news.publication {
        writer.write_event(Event::Start(BytesStart::new("news:publication")))?;
        write_opt(writer, "news:name", &publication.name)?;
        write_opt(writer, "news:language", &publication.language)?;
        writer.write_event(Event::End(BytesEnd::new("news:publication")))?;
    }

    write_opt(writer, "news:publication_date", &news.pub_date)?;
    write_opt(writer, "news:title", &news.title)?;
    write_opt(writer, "news:keywords", &news.keywords)?;
    write_opt(writer, "news:description", &news.description)?;

    writer.write_event(Event::End(BytesEnd::new("news:news")))?;
    Ok(())
}

fn write_text(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_opt(writer: &mut Writer<Vec<u8>>, tag: &str, text: &Option<String>) -> Result<()> {
    if let Some(text) = text {
        write_text(writer, tag, text)?;
    }
    Ok(())
}
