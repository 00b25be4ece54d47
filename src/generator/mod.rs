//! Concurrent sitemap generation across configured sources.
//!
//! One worker per source runs the fetch -> build -> write cycle, either once
//! or on a live-update interval. Produced filenames flow over a single
//! channel to the aggregator, the sole writer of the sitemap-index file, so
//! index rebuilds need no locking. Fetch and build failures abandon one
//! cycle; write failures take the whole process down, because a missing
//! output file would silently desynchronize the index from reality.

use crate::config::{
    ConfigError, GeneralConfig, ServeConfig, SitemapConfig, FieldMapConfig, Stylesheet,
};
use crate::fetch::{fetch_all, DocumentSource};
use crate::server::FileServer;
use crate::sitemap::{builder, render, Extensions, IndexFile};
use anyhow::{bail, Context, Result};
use chrono::Local;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

const DATE_LAYOUT: &str = "%Y-%m-%d";

/// Flattened runtime view of one configured source.
#[derive(Debug, Clone)]
struct SourceTask {
    index: String,
    filter: Option<String>,
    base_address: String,
    compress: bool,
    /// Final output file name, prefix and extension included.
    file_name: String,
    /// Regeneration interval for live sources.
    live_interval: Option<Duration>,
    fields: FieldMapConfig,
    extensions: Extensions,
}

/// Orchestrates one worker per configured source plus the index aggregator.
pub struct Generator {
    source: Arc<dyn DocumentSource>,
    store_path: PathBuf,
    sitemap_dir: PathBuf,
    base_url: String,
    indexsitemap_path: String,
    index_file_name: String,
    stylesheet: Option<Stylesheet>,
    serve: Option<ServeConfig>,
    tasks: Vec<SourceTask>,
    shutdown: watch::Receiver<bool>,
}

impl Generator {
    /// Prepare the store layout and flatten the configured sources into
    /// runtime tasks. Failing to create the store layout is fatal.
    pub fn new(
        general: &GeneralConfig,
        sitemaps: &HashMap<String, SitemapConfig>,
        store_path: &Path,
        source: Arc<dyn DocumentSource>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let sitemap_dir = store_path.join(&general.indexsitemap_path);
        std::fs::create_dir_all(&sitemap_dir).with_context(|| {
            format!("failed to create sitemap directory {}", sitemap_dir.display())
        })?;

        let prefix = general.prefix.clone().unwrap_or_default();

        // Deterministic worker order regardless of map iteration.
        let mut names: Vec<&String> = sitemaps.keys().collect();
        names.sort();

        let mut tasks = Vec::with_capacity(names.len());
        for name in names {
            let cfg = &sitemaps[name];
            let fields = cfg
                .field_map
                .clone()
                .ok_or_else(|| ConfigError::MissingFieldMap(name.clone()))?;

            let base_name = cfg.sitemap_file_name.clone().unwrap_or_else(|| name.clone());
            let extension = if cfg.compress { ".xml.gz" } else { ".xml" };
            let file_name = format!("{prefix}{base_name}{extension}");

            let live_interval = match cfg.live_update.as_ref().filter(|live| live.enabled) {
                Some(live) if live.interval > 0 => Some(Duration::from_secs(live.interval)),
                Some(_) => {
                    warn!(index = name, "live_update interval is zero, running once");
                    None
                }
                None => None,
            };

            tasks.push(SourceTask {
                index: name.clone(),
                filter: cfg.filter.clone(),
                base_address: cfg.base_address.clone(),
                compress: cfg.compress,
                file_name,
                live_interval,
                extensions: Extensions::from_field_map(&fields),
                fields,
            });
        }

        Ok(Self {
            source,
            store_path: store_path.to_path_buf(),
            sitemap_dir,
            base_url: general.base_url.clone(),
            indexsitemap_path: general.indexsitemap_path.clone(),
            index_file_name: general
                .file_name
                .clone()
                .unwrap_or_else(|| "sitemap".to_string()),
            stylesheet: general.stylesheet,
            serve: general.serve.clone(),
            tasks,
            shutdown,
        })
    }

    /// Run every source to completion (or until shutdown for live sources).
    ///
    /// Returns the first fatal failure: a missing index at startup, a file
    /// server failure, a sitemap write failure, or an index write failure.
    pub async fn run(self) -> Result<()> {
        let Generator {
            source,
            store_path,
            sitemap_dir,
            base_url,
            indexsitemap_path,
            index_file_name,
            stylesheet,
            serve,
            tasks,
            shutdown,
        } = self;

        // Every configured index must exist before any worker starts.
        for task in &tasks {
            match source.index_exists(&task.index).await {
                Ok(true) => {}
                Ok(false) => bail!("index {} does not exist", task.index),
                Err(err) => {
                    return Err(err.context(format!("failed to verify index {}", task.index)))
                }
            }
        }

        let mut join_set: JoinSet<Result<()>> = JoinSet::new();

        // Optional file server; when active, its address replaces the public
        // base URL in sitemap-index locations.
        let mut serve_addr = None;
        if let Some(serve) = serve.filter(|s| s.enable) {
            let server = FileServer::bind(&serve.listen, &store_path).await?;
            serve_addr = Some(format!("http://{}", server.local_addr()?));
            let shutdown = shutdown.clone();
            join_set.spawn(async move { server.serve(shutdown).await });
        }

        let loc_base = join_url(
            serve_addr.as_deref().unwrap_or(&base_url),
            &[indexsitemap_path.as_str()],
        );
        let index_path = store_path.join(format!("{index_file_name}.xml"));
        let mut aggregator = IndexAggregator::new(index_path, loc_base);

        let (tx, mut rx) = mpsc::channel::<String>(1024);
        join_set.spawn(async move {
            while let Some(file_name) = rx.recv().await {
                aggregator.observe(file_name)?;
            }
            Ok(())
        });

        for task in tasks {
            let source = Arc::clone(&source);
            let tx = tx.clone();
            let shutdown = shutdown.clone();
            let sitemap_dir = sitemap_dir.clone();
            join_set
                .spawn(async move { run_worker(source, task, sitemap_dir, stylesheet, tx, shutdown).await });
        }
        // The aggregator intake closes once every worker has dropped its
        // sender clone.
        drop(tx);

        let mut failure = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(%err, "fatal failure, shutting down");
                    if failure.is_none() {
                        failure = Some(err);
                    }
                    join_set.abort_all();
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    if failure.is_none() {
                        failure = Some(anyhow::Error::new(err).context("worker panicked"));
                    }
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

async fn run_worker(
    source: Arc<dyn DocumentSource>,
    task: SourceTask,
    sitemap_dir: PathBuf,
    stylesheet: Option<Stylesheet>,
    tx: mpsc::Sender<String>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let Some(interval) = task.live_interval else {
        return run_cycle(source.as_ref(), &task, &sitemap_dir, stylesheet, &tx).await;
    };

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!(index = %task.index, "stopping live source");
                return Ok(());
            }
            _ = ticker.tick() => {
                run_cycle(source.as_ref(), &task, &sitemap_dir, stylesheet, &tx).await?;
            }
        }
    }
}

/// One fetch -> build -> write cycle for one source.
///
/// Fetch and render failures end the cycle with a log line; only the write
/// failure propagates as fatal.
async fn run_cycle(
    source: &dyn DocumentSource,
    task: &SourceTask,
    sitemap_dir: &Path,
    stylesheet: Option<Stylesheet>,
    tx: &mpsc::Sender<String>,
) -> Result<()> {
    info!(index = %task.index, "started fetching documents");

    let docs = match fetch_all(source, &task.index, task.filter.as_deref()).await {
        Ok(docs) => docs,
        Err(err) => {
            error!(index = %task.index, %err, "failed to fetch documents");
            return Ok(());
        }
    };

    let entries = builder::build_entries(&docs, &task.index, &task.base_address, &task.fields);

    let bytes = match render_bytes(&entries, task, stylesheet) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(index = %task.index, %err, "failed to render sitemap");
            return Ok(());
        }
    };

    let path = sitemap_dir.join(&task.file_name);
    std::fs::write(&path, &bytes)
        .with_context(|| format!("failed to write sitemap {}", path.display()))?;

    // A full aggregator queue only slows this source's next cycle.
    tx.send(task.file_name.clone()).await.ok();

    info!(
        index = %task.index,
        file = %task.file_name,
        entries = entries.len(),
        "created sitemap"
    );
    Ok(())
}

fn render_bytes(
    entries: &[crate::sitemap::UrlEntry],
    task: &SourceTask,
    stylesheet: Option<Stylesheet>,
) -> Result<Vec<u8>> {
    let xml = render::render_urlset(entries, task.extensions, stylesheet)?;
    if task.compress {
        render::compress(&xml)
    } else {
        Ok(xml)
    }
}

/// Sole owner of the sitemap-index file. The known-filename set only grows
/// and is deduplicated, so a live source republishing a stable filename
/// never produces duplicate index entries.
struct IndexAggregator {
    index_path: PathBuf,
    loc_base: String,
    known: Vec<String>,
}

impl IndexAggregator {
    fn new(index_path: PathBuf, loc_base: String) -> Self {
        Self {
            index_path,
            loc_base,
            known: Vec::new(),
        }
    }

    /// Record a produced filename, rewriting the index when it is new.
    /// Returns whether the filename was new.
    fn observe(&mut self, file_name: String) -> Result<bool> {
        if self.known.contains(&file_name) {
            return Ok(false);
        }

        self.known.push(file_name);
        self.rewrite()?;
        Ok(true)
    }

    fn rewrite(&self) -> Result<()> {
        let lastmod = Local::now().format(DATE_LAYOUT).to_string();
        let files: Vec<IndexFile> = self
            .known
            .iter()
            .map(|name| IndexFile {
                loc: join_url(&self.loc_base, &[name.as_str()]),
                lastmod: lastmod.clone(),
            })
            .collect();

        let xml = render::render_index(&files)?;
        std::fs::write(&self.index_path, &xml).with_context(|| {
            format!(
                "failed to write sitemap index {}",
                self.index_path.display()
            )
        })
    }
}

/// Join URL segments with single slashes, skipping empty segments.
fn join_url(base: &str, parts: &[&str]) -> String {
    let mut out = base.trim_end_matches('/').to_string();
    for part in parts {
        let part = part.trim_matches('/');
        if part.is_empty() {
            continue;
        }
        out.push('/');
        out.push_str(part);
    }
    out
}
