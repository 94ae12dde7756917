//! Console and JSON reporting of pipeline results.

use std::io::{self, Write};
use std::path::Path;

use nalgebra::Point2;
use pcaruco_core::TileMask;
use serde_json::json;

use crate::error::PipelineError;
use crate::pipeline::{FrameReport, InputOutcome};

/// Receives pipeline results as they are produced.
pub trait Reporter {
    /// A new input file is about to be processed.
    fn input(&mut self, path: &Path) -> io::Result<()>;
    fn frame(&mut self, frame: &FrameReport) -> io::Result<()>;
    fn empty_tile(&mut self, tile: TileMask) -> io::Result<()>;
    /// `context` names the tile or input that failed.
    fn failure(&mut self, context: &str, err: &PipelineError) -> io::Result<()>;
}

/// Feed every frame and failure of `outcome` to `reporter`.
pub fn report_outcome<R: Reporter + ?Sized>(
    reporter: &mut R,
    outcome: &InputOutcome,
) -> io::Result<()> {
    match outcome {
        InputOutcome::Image(frame) => reporter.frame(frame),
        InputOutcome::PointCloud(tiles) => {
            for t in tiles {
                match &t.result {
                    Ok(frame) => reporter.frame(frame)?,
                    Err(PipelineError::EmptyTile { tile }) => reporter.empty_tile(*tile)?,
                    Err(e) => reporter.failure(&format!("tile {}", t.tile), e)?,
                }
            }
            Ok(())
        }
    }
}

/// Human-readable report: markers, ids and rejected candidates per frame.
#[derive(Debug)]
pub struct ConsoleReporter<W> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn fmt_quad(q: &[Point2<f32>; 4]) -> String {
    q.iter()
        .map(|p| format!("({:.1}, {:.1})", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn input(&mut self, path: &Path) -> io::Result<()> {
        writeln!(self.out, "== {} ==", path.display())
    }

    fn frame(&mut self, frame: &FrameReport) -> io::Result<()> {
        let out = &mut self.out;
        writeln!(out, "{} ({}x{})", frame.source, frame.width, frame.height)?;
        writeln!(out, "  markers: {}", frame.markers.len())?;
        for m in &frame.markers {
            writeln!(out, "    id {}: {}", m.id, fmt_quad(&m.corners))?;
            if let Some(world) = &m.corners_world {
                let pts: Vec<String> = world
                    .iter()
                    .map(|c| match c {
                        Some([x, y, z]) => format!("({x:.3}, {y:.3}, {z:.3})"),
                        None => "-".to_string(),
                    })
                    .collect();
                writeln!(out, "      world: {}", pts.join(" "))?;
            }
        }
        writeln!(out, "  ids: {:?}", frame.ids())?;
        writeln!(out, "  rejected: {}", frame.rejected.len())?;
        for q in &frame.rejected {
            writeln!(out, "    {}", fmt_quad(q))?;
        }
        Ok(())
    }

    fn empty_tile(&mut self, tile: TileMask) -> io::Result<()> {
        writeln!(self.out, "no data for tile {tile}")
    }

    fn failure(&mut self, context: &str, err: &PipelineError) -> io::Result<()> {
        writeln!(self.out, "{context}: error: {err}")
    }
}

/// One JSON document per line for every event.
#[derive(Debug)]
pub struct JsonReporter<W> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, value: &impl serde::Serialize) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        writeln!(self.out)
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn input(&mut self, path: &Path) -> io::Result<()> {
        self.line(&json!({ "input": path }))
    }

    fn frame(&mut self, frame: &FrameReport) -> io::Result<()> {
        self.line(frame)
    }

    fn empty_tile(&mut self, tile: TileMask) -> io::Result<()> {
        self.line(&json!({ "tile": tile, "status": "empty" }))
    }

    fn failure(&mut self, context: &str, err: &PipelineError) -> io::Result<()> {
        self.line(&json!({ "context": context, "error": err.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FrameSource, MarkerReport, TileOutcome};
    use pcaruco_core::RasterImage;

    fn frame() -> FrameReport {
        FrameReport {
            source: FrameSource::Tile {
                tile: TileMask::TILE_2,
            },
            width: 8,
            height: 8,
            points: 5,
            markers: vec![MarkerReport {
                id: 7,
                corners: [
                    Point2::new(1.0, 1.0),
                    Point2::new(6.0, 1.0),
                    Point2::new(6.0, 6.0),
                    Point2::new(1.0, 6.0),
                ],
                corners_world: Some([Some([0.5, 0.25, 1.0]), None, None, None]),
            }],
            rejected: Vec::new(),
            image: RasterImage::new(8, 8, [0, 0, 0]),
        }
    }

    fn outcome() -> InputOutcome {
        InputOutcome::PointCloud(vec![
            TileOutcome {
                tile: TileMask::TILE_1,
                result: Err(PipelineError::EmptyTile {
                    tile: TileMask::TILE_1,
                }),
            },
            TileOutcome {
                tile: TileMask::TILE_2,
                result: Ok(frame()),
            },
        ])
    }

    #[test]
    fn console_lists_markers_and_empty_tiles() {
        let mut rep = ConsoleReporter::new(Vec::new());
        report_outcome(&mut rep, &outcome()).expect("report");
        let text = String::from_utf8(rep.into_inner()).expect("utf8");
        assert!(text.contains("no data for tile 1"));
        assert!(text.contains("tile 2 (8x8)"));
        assert!(text.contains("id 7: (1.0, 1.0) (6.0, 1.0) (6.0, 6.0) (1.0, 6.0)"));
        assert!(text.contains("world: (0.500, 0.250, 1.000) - - -"));
        assert!(text.contains("ids: [7]"));
        assert!(text.contains("rejected: 0"));
    }

    #[test]
    fn json_emits_one_document_per_event() {
        let mut rep = JsonReporter::new(Vec::new());
        report_outcome(&mut rep, &outcome()).expect("report");
        let text = String::from_utf8(rep.into_inner()).expect("utf8");
        let docs: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["status"], "empty");
        assert_eq!(docs[0]["tile"], 1);
        assert_eq!(docs[1]["source"]["kind"], "tile");
        assert_eq!(docs[1]["markers"][0]["id"], 7);
        assert!(docs[1].get("image").is_none());
    }
}
