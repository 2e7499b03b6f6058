//! Deterministic loader for tests: completions happen only when the test says so.

use std::cell::RefCell;
use std::rc::Rc;

use image::{Rgba, RgbaImage};

use super::{ImageLoader, LoadError, LoadResult, LoadTicket};

#[derive(Debug, Default)]
pub(crate) struct ManualImageLoader {
    /// Every request ever made, in arrival order.
    pub history: Vec<String>,
    outstanding: Vec<(LoadTicket, String)>,
    ready: Vec<LoadResult>,
}

impl ManualImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.history.iter().filter(|u| *u == url).count()
    }

    /// Completes every outstanding request for `url` with a solid image.
    pub fn complete(&mut self, url: &str, width: u32, height: u32) {
        for ticket in self.take(url) {
            let image = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
            self.ready.push(LoadResult { ticket, url: url.to_string(), image: Ok(image) });
        }
    }

    pub fn fail(&mut self, url: &str) {
        for ticket in self.take(url) {
            self.ready.push(LoadResult {
                ticket,
                url: url.to_string(),
                image: Err(LoadError::Io { url: url.to_string(), reason: "404".into() }),
            });
        }
    }

    fn take(&mut self, url: &str) -> Vec<LoadTicket> {
        let (hit, keep): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.outstanding).into_iter().partition(|(_, u)| u == url);
        self.outstanding = keep;
        hit.into_iter().map(|(t, _)| t).collect()
    }
}

impl ImageLoader for ManualImageLoader {
    fn request(&mut self, ticket: LoadTicket, url: &str) {
        self.history.push(url.to_string());
        self.outstanding.push((ticket, url.to_string()));
    }

    fn drain_completed(&mut self) -> Vec<LoadResult> {
        std::mem::take(&mut self.ready)
    }
}

/// Lets a test keep driving the loader after handing it to a manager.
impl ImageLoader for Rc<RefCell<ManualImageLoader>> {
    fn request(&mut self, ticket: LoadTicket, url: &str) {
        self.borrow_mut().request(ticket, url);
    }

    fn drain_completed(&mut self) -> Vec<LoadResult> {
        self.borrow_mut().drain_completed()
    }
}
