use super::types::ImageUrl;
use std::num::NonZeroUsize;

/// A contiguous, order-preserving slice of the URL list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Batch<'a> {
    pub index: usize,
    pub urls: &'a [ImageUrl],
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

pub fn partition(urls: &[ImageUrl], batch_size: NonZeroUsize) -> Vec<Batch<'_>> {
    urls.chunks(batch_size.get())
        .enumerate()
        .map(|(index, urls)| Batch { index, urls })
        .collect()
}
