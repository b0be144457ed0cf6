use std::io::Read;

/// Receives `(loaded_bytes, total_bytes)` as a request body is read.
pub type ProgressSink = Box<dyn Fn(u64, u64) + Send + 'static>;

/// Percentage of `total` covered by `loaded`, rounded and clamped to 0..=100.
///
/// An empty body counts as fully sent.
pub fn progress_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (loaded as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Wraps a reader and reports how many bytes have been pulled through it.
pub struct ProgressReader<R> {
    inner: R,
    loaded: u64,
    total: u64,
    sink: ProgressSink,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, total: u64, sink: ProgressSink) -> Self {
        Self {
            inner,
            loaded: 0,
            total,
            sink,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.loaded += n as u64;
            (self.sink)(self.loaded, self.total);
        }
        Ok(n)
    }
}
