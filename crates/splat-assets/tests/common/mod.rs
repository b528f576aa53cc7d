#![allow(dead_code)]

use std::{
    fmt::Write as _,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use splat_assets::{
    LoadOptions, MemorySource, ProgressReporter, Source, TransformConfig, source::FetchFuture,
};
use tokio::sync::watch;

pub const BANANA: &str = "splats/banana.ply";
pub const BANANA_PATH: &str = "/assets/splats/banana.ply";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A small ascii PLY: a bent strip of 8 coloured points with an opacity.
pub fn banana_ply() -> Vec<u8> {
    let mut ply = String::from(
        "ply
format ascii 1.0
comment banana
element vertex 8
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
property float opacity
end_header
",
    );
    for i in 0..8u8 {
        let t = f32::from(i) / 7.0;
        let x = t * 2.0 - 1.0;
        let y = x * x * 0.5;
        let _ = writeln!(ply, "{x} {y} 0 255 {} 0 {}", 200 + i, 0.5 + t * 0.5);
    }
    ply.into_bytes()
}

pub fn optimize_options() -> LoadOptions {
    LoadOptions::default().with_transform(TransformConfig {
        optimize: true,
        ..TransformConfig::default()
    })
}

/// A source that counts fetches and holds each one until its gate opens.
#[derive(Clone)]
pub struct GatedSource {
    inner: MemorySource,
    fetches: Arc<AtomicUsize>,
    gate: watch::Receiver<bool>,
}

pub struct Gate(watch::Sender<bool>);

impl Gate {
    pub fn open(&self) {
        self.0.send_replace(true);
    }
}

impl GatedSource {
    /// A source whose fetches wait for the returned gate.
    pub fn closed() -> (Self, Gate) {
        let (tx, rx) = watch::channel(false);
        let source = Self {
            inner: MemorySource::new(),
            fetches: Arc::default(),
            gate: rx,
        };
        (source, Gate(tx))
    }

    /// A source that never blocks.
    pub fn open() -> Self {
        let (source, gate) = Self::closed();
        gate.open();
        source
    }

    pub fn insert(&self, url: &str, data: Vec<u8>) {
        self.inner.insert(url, data);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Source for GatedSource {
    fn fetch<'a>(&'a self, url: &'a str, progress: &'a ProgressReporter) -> FetchFuture<'a> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut gate = self.gate.clone();
            let _ = gate.wait_for(|open| *open).await.map(|_| ());
            self.inner.fetch(url, progress).await
        })
    }
}
