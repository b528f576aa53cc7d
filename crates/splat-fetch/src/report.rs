//! Human-readable summaries of loaded assets.

use std::fmt::Write as _;

use splat_assets::{Asset, CacheStats, Payload};

fn payload_kind(payload: &Payload) -> &'static str {
    match payload {
        Payload::Geometry(_) => "geometry",
        Payload::CompressedGeometry(_) => "compressed geometry",
        Payload::Bytes(_) => "bytes",
        Payload::Compressed(_) => "compressed bytes",
        Payload::Structured(_) => "json",
        Payload::Texture(_) => "texture",
    }
}

/// One line per asset, plus indented detail lines.
pub fn asset_summary(asset: &Asset) -> String {
    let mut out = format!(
        "{}: {} ({} bytes)",
        asset.url,
        payload_kind(&asset.payload),
        asset.byte_size()
    );

    let names = asset.attribute_names();
    if !names.is_empty() {
        let _ = write!(out, "\n  attributes: {}", names.join(", "));
    }
    if let Payload::Texture(texture) = &asset.payload {
        let _ = write!(out, "\n  size: {}x{}", texture.width, texture.height);
    }
    if let Some(bounds) = &asset.bounds {
        let _ = write!(
            out,
            "\n  bounds: min {} max {} radius {:.3}",
            bounds.min, bounds.max, bounds.radius
        );
    }
    if let Some(report) = &asset.compression {
        let _ = write!(
            out,
            "\n  compressed: {} {} -> {} bytes (ratio {:.3}, {:.1} ms)",
            report.format,
            report.original_size,
            report.compressed_size,
            report.compression_ratio,
            report.compression_time_ms
        );
    }
    out
}

pub fn stats_summary(stats: &CacheStats) -> String {
    format!(
        "cache: {} assets, {} bytes total, {:.1} bytes average",
        stats.asset_count, stats.total_size, stats.average_size
    )
}
