use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use image::RgbaImage;

/// Correlates a load request with its completion.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("unsupported asset scheme: {0}")]
    UnsupportedScheme(String),
    #[error("failed to read {url}: {reason}")]
    Io { url: String, reason: String },
    #[error("failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("image loader shut down before {0} completed")]
    Disconnected(String),
}

/// A finished decode.
#[derive(Debug)]
pub struct LoadResult {
    pub ticket: LoadTicket,
    pub url: String,
    pub image: Result<RgbaImage, LoadError>,
}

/// Asynchronous image source.
///
/// `request` must not block; completions are picked up by the render thread
/// through `drain_completed`, once per frame.
pub trait ImageLoader {
    fn request(&mut self, ticket: LoadTicket, url: &str);
    fn drain_completed(&mut self) -> Vec<LoadResult>;
}

struct Job {
    ticket: LoadTicket,
    url: String,
}

/// Decodes images on a small worker pool using the `image` crate.
pub struct ThreadedImageLoader {
    jobs: Option<Sender<Job>>,
    results: Receiver<LoadResult>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadedImageLoader {
    pub fn new(worker_count: usize) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel::<LoadResult>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = (0..worker_count.max(1))
            .filter_map(|i| {
                let job_rx = Arc::clone(&job_rx);
                let result_tx = result_tx.clone();
                std::thread::Builder::new()
                    .name(format!("bastion-image-{i}"))
                    .spawn(move || worker_loop(&job_rx, &result_tx))
                    .map_err(|e| log::error!("failed to spawn image worker {i}: {e}"))
                    .ok()
            })
            .collect();

        Self { jobs: Some(job_tx), results: result_rx, workers }
    }
}

impl Default for ThreadedImageLoader {
    fn default() -> Self {
        Self::new(2)
    }
}

impl ImageLoader for ThreadedImageLoader {
    fn request(&mut self, ticket: LoadTicket, url: &str) {
        let Some(jobs) = self.jobs.as_ref() else { return };
        if jobs.send(Job { ticket, url: url.to_string() }).is_err() {
            log::warn!("image loader has no live workers; dropping request for {url}");
        }
    }

    fn drain_completed(&mut self) -> Vec<LoadResult> {
        self.results.try_iter().collect()
    }
}

impl Drop for ThreadedImageLoader {
    fn drop(&mut self) {
        // Closing the job channel ends every worker loop.
        self.jobs = None;
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(jobs: &Mutex<Receiver<Job>>, results: &Sender<LoadResult>) {
    loop {
        let job = {
            let Ok(rx) = jobs.lock() else { return };
            match rx.recv() {
                Ok(job) => job,
                Err(_) => return,
            }
        };
        let image = decode_url(&job.url);
        if results.send(LoadResult { ticket: job.ticket, url: job.url, image }).is_err() {
            return;
        }
    }
}

fn decode_url(url: &str) -> Result<RgbaImage, LoadError> {
    let path = url_to_path(url)?;
    let bytes = std::fs::read(&path).map_err(|e| LoadError::Io {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| LoadError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(decoded.to_rgba8())
}

fn url_to_path(url: &str) -> Result<PathBuf, LoadError> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    if url.contains("://") || url.starts_with("data:") || url.starts_with("blob:") {
        return Err(LoadError::UnsupportedScheme(url.to_string()));
    }
    Ok(PathBuf::from(url.trim_start_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_urls_map_to_paths() {
        assert_eq!(url_to_path("file:///tmp/a.png").unwrap(), PathBuf::from("/tmp/a.png"));
    }

    #[test]
    fn http_is_rejected() {
        assert!(matches!(
            url_to_path("https://cdn.example/a.png"),
            Err(LoadError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let mut loader = ThreadedImageLoader::new(1);
        loader.request(LoadTicket(7), "file:///definitely/not/here.png");

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        let mut done = Vec::new();
        while done.is_empty() && std::time::Instant::now() < deadline {
            done = loader.drain_completed();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(done.len(), 1);
        assert_eq!(done[0].ticket, LoadTicket(7));
        assert!(matches!(done[0].image, Err(LoadError::Io { .. })));
    }
}
