//! Helixwave offline demo.
//!
//! Loads a WAV, derives the deterministic structure, and steps the
//! per-frame pipeline with synthetic 60 Hz deltas, printing a summary of
//! what a renderer would have drawn. Useful for eyeballing determinism
//! (the content hash and node count repeat run to run) and for exporting
//! the structure as JSON.

mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use helixwave::{HelixError, ModeKind, RenderGeometry, Visualizer};

fn main() -> Result<(), HelixError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = cli::Args::parse();
    let tuning = args.parse_preset().tuning();
    let kind = args.parse_mode();

    let mut viz = Visualizer::new(tuning, kind);
    viz.set_sensitivity(args.sensitivity);

    match &args.audio {
        Some(path) => {
            viz.load_audio(path)?;
            println!("Loaded {}", path.display());
            println!("Content hash: {}", viz.content_hash());
            let nodes = viz.export_structure().map(|n| n.len()).unwrap_or(0);
            println!("Structure: {} nodes", nodes);
        }
        None => println!("No audio given; running the neutral spiral"),
    }

    let dt = 1.0 / 60.0;
    let mut peak_loudness = 0.0f32;
    let mut peak_hit = 0.0f32;
    let mut peak_bloom = 0.0f32;

    for frame_index in 0..args.frames {
        if args.switch_halfway && frame_index == args.frames / 2 {
            let next = match viz.mode_kind() {
                ModeKind::Micro => ModeKind::Macro,
                ModeKind::Macro => ModeKind::Micro,
            };
            viz.set_mode(next);
            println!("Switched to {:?} at frame {}", next, frame_index);
        }

        let frame = viz.advance_frame(dt);
        peak_loudness = peak_loudness.max(frame.loudness);
        peak_hit = peak_hit.max(frame.bass_hit);
        peak_bloom = peak_bloom.max(viz.post_fx(&frame).bloom_strength);
    }

    match viz.geometry() {
        RenderGeometry::Cloud { points } => {
            println!("Geometry: point cloud, {} points", points.len())
        }
        RenderGeometry::Graph { nodes, edges } => println!(
            "Geometry: graph, {} nodes / {} edge segments",
            nodes.len(),
            edges.len() / 2
        ),
        RenderGeometry::Empty => println!("Geometry: empty"),
    }
    println!(
        "{} frames: peak loudness {:.3}, peak bass hit {:.3}, peak bloom {:.3}",
        args.frames, peak_loudness, peak_hit, peak_bloom
    );

    if let Some(path) = &args.export {
        let nodes = viz.export_structure().unwrap_or_default();
        let json = serde_json::to_string_pretty(&nodes)?;
        std::fs::write(path, json)?;
        println!("Structure exported to {}", path.display());
    }

    Ok(())
}
