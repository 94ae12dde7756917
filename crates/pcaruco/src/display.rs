//! Showing annotated frames and waiting for the user to dismiss them.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use pcaruco_core::RasterImage;

use crate::draw::{annotate, DrawStyle};
use crate::error::DisplayError;
use crate::pipeline::FrameReport;

/// Key code that dismisses a frame (ESC).
pub const EXIT_KEY: u8 = 27;

/// Presents a frame to the user.
pub trait Viewer {
    fn show(&mut self, title: &str, image: &RasterImage) -> Result<(), DisplayError>;
}

/// Blocking source of key presses; `None` means no more input.
pub trait KeySource {
    fn next_key(&mut self) -> Result<Option<u8>, DisplayError>;
}

/// Block until [`EXIT_KEY`] arrives or the key source runs dry.
pub fn wait_for_dismiss<K: KeySource + ?Sized>(keys: &mut K) -> Result<(), DisplayError> {
    loop {
        match keys.next_key()? {
            Some(EXIT_KEY) => return Ok(()),
            Some(k) => log::info!("ignoring key {k}"),
            None => {
                log::debug!("key source closed");
                return Ok(());
            }
        }
    }
}

/// Annotate `frame`, hand it to `viewer`, then wait for dismissal.
pub fn show_frame<V, K>(
    viewer: &mut V,
    keys: &mut K,
    frame: &FrameReport,
    style: &DrawStyle,
) -> Result<(), DisplayError>
where
    V: Viewer + ?Sized,
    K: KeySource + ?Sized,
{
    let annotated = annotate(frame, style);
    viewer.show(&frame.source.to_string(), &annotated)?;
    wait_for_dismiss(keys)
}

/// Writes every shown frame as a PNG into a directory.
#[derive(Debug)]
pub struct PngViewer {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl PngViewer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn file_name(&self, title: &str) -> String {
        let stem: String = title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{:03}_{stem}.png", self.written.len())
    }
}

impl Viewer for PngViewer {
    fn show(&mut self, title: &str, image: &RasterImage) -> Result<(), DisplayError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(self.file_name(title));
        save_png(&path, image)?;
        log::info!("{title}: wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

fn save_png(path: &Path, image: &RasterImage) -> Result<(), DisplayError> {
    image::save_buffer_with_format(
        path,
        image.as_raw(),
        image.width() as u32,
        image.height() as u32,
        image::ExtendedColorType::Rgb8,
        image::ImageFormat::Png,
    )?;
    Ok(())
}

/// Key presses read byte by byte; line breaks are skipped.
#[derive(Debug)]
pub struct StdinKeys<R = io::Stdin> {
    input: R,
}

impl StdinKeys<io::Stdin> {
    pub fn stdin() -> Self {
        Self { input: io::stdin() }
    }
}

impl<R: Read> StdinKeys<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: Read> KeySource for StdinKeys<R> {
    fn next_key(&mut self) -> Result<Option<u8>, DisplayError> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) if matches!(byte[0], b'\n' | b'\r') => continue,
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_escape_and_leaves_the_rest() {
        let mut keys = StdinKeys::new(&b"a\nb\x1bz"[..]);
        wait_for_dismiss(&mut keys).expect("wait");
        assert_eq!(keys.next_key().expect("key"), Some(b'z'));
    }

    #[test]
    fn end_of_input_dismisses() {
        let mut keys = StdinKeys::new(&b"xyz\n"[..]);
        wait_for_dismiss(&mut keys).expect("wait");
        assert_eq!(keys.next_key().expect("key"), None);
    }

    #[test]
    fn png_viewer_writes_numbered_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut viewer = PngViewer::new(dir.path().join("frames"));
        let img = RasterImage::new(4, 3, [0, 255, 0]);
        viewer.show("tile 1", &img).expect("show");
        viewer.show("tile 2", &img).expect("show");

        let names: Vec<String> = viewer
            .written()
            .iter()
            .map(|p| p.file_name().unwrap_or_default().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["000_tile_1.png", "001_tile_2.png"]);

        let back = image::open(&viewer.written()[0]).expect("png").to_rgb8();
        assert_eq!(back.dimensions(), (4, 3));
        assert_eq!(back.get_pixel(0, 0).0, [0, 255, 0]);
    }
}
