use std::path::Path;

use log::{debug, info};
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio,
};

use crate::bbox::BoundingBox;
use crate::error::Error;
use crate::evaluator::Outcome;
use crate::render::{Overlay, Renderer};
use crate::source::FrameSource;

/// Frames decoded from a video file.
pub struct VideoSource {
    cam: videoio::VideoCapture,
    frame_count: Option<usize>,
    dims: Option<(u32, u32)>,
}

impl VideoSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let name = path.as_ref().to_string_lossy().to_string();
        let cam = videoio::VideoCapture::from_file(&name, videoio::CAP_ANY)
            .map_err(|_| Error::SourceUnavailable(name.clone()))?;

        if !cam.is_opened()? {
            return Err(Error::SourceUnavailable(name));
        }

        let width = cam.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = cam.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let total = cam.get(videoio::CAP_PROP_FRAME_COUNT)?;

        info!("video {} {}x{} {} frames", name, width, height, total);

        Ok(Self {
            cam,
            frame_count: (total >= 1.0).then_some(total as usize),
            dims: (width > 0 && height > 0).then_some((width, height)),
        })
    }
}

impl FrameSource for VideoSource {
    type Frame = Mat;

    fn read_next(&mut self) -> Result<Option<Mat>, Error> {
        let mut frame = Mat::default();
        if !self.cam.read(&mut frame)? {
            return Ok(None);
        }

        if frame.cols() == 0 || frame.rows() == 0 {
            return Ok(None);
        }

        Ok(Some(frame))
    }

    #[inline]
    fn frame_count(&self) -> Option<usize> {
        self.frame_count
    }

    #[inline]
    fn dims(&self) -> Option<(u32, u32)> {
        self.dims
    }
}

const ANNOTATION_COLOR: (f64, f64, f64) = (255.0, 0.0, 0.0);
const TRACKED_COLOR: (f64, f64, f64) = (0.0, 255.0, 255.0);
const TEXT_COLOR: (f64, f64, f64) = (0.0, 230.0, 255.0);
const FAILED_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);

fn scalar((b, g, r): (f64, f64, f64)) -> core::Scalar {
    core::Scalar::new(b, g, r, 255.0)
}

/// Writes annotated frames to an MJPG video.
///
/// The writer is opened on the first frame and reopened whenever the frame
/// size changes.
pub struct VideoRenderer {
    writer: Option<videoio::VideoWriter>,
    size: Option<(i32, i32)>,
    out_file: String,
    label: String,
    fps: f64,
}

impl VideoRenderer {
    pub fn new<S: ToString, L: ToString>(out_file: S, label: L) -> Self {
        Self {
            writer: None,
            size: None,
            out_file: out_file.to_string(),
            label: label.to_string(),
            fps: 20.0,
        }
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn release(&mut self) -> Result<(), Error> {
        if let Some(mut w) = self.writer.take() {
            w.release()?;
        }

        Ok(())
    }

    fn reinit(&mut self, size: (i32, i32)) -> Result<(), Error> {
        debug!("opening {} at {:?}", self.out_file, size);
        self.release()?;

        self.size = Some(size);
        self.writer = Some(videoio::VideoWriter::new(
            &self.out_file,
            videoio::VideoWriter::fourcc(b'M' as _, b'J' as _, b'P' as _, b'G' as _)?,
            self.fps,
            core::Size::new(size.0, size.1),
            true,
        )?);

        Ok(())
    }

    fn feed(&mut self, m: &Mat) -> Result<(), Error> {
        let size = (m.cols(), m.rows());

        if self.writer.is_none() || self.size != Some(size) {
            self.reinit(size)?;
        }

        if let Some(w) = self.writer.as_mut() {
            w.write(m)?;
        }

        Ok(())
    }
}

fn draw_box(frame: &mut Mat, bbox: &BoundingBox<i32>, color: core::Scalar) -> Result<(), Error> {
    imgproc::rectangle(frame, (*bbox).into(), color, 2, imgproc::LINE_8, 0)?;

    Ok(())
}

impl Renderer<Mat> for VideoRenderer {
    fn render(&mut self, frame: &Mat, overlay: &Overlay<'_>) -> Result<(), Error> {
        let mut canvas = frame.try_clone()?;

        if let Some(annotation) = overlay.annotation {
            draw_box(&mut canvas, annotation, scalar(ANNOTATION_COLOR))?;
        }

        if let Some(Outcome::Tracked { bbox, .. }) = overlay.outcome {
            draw_box(&mut canvas, bbox, scalar(TRACKED_COLOR))?;
        }

        let failed = overlay.outcome.is_some_and(|o| o.is_failed());
        for (idx, line) in overlay.lines(&self.label).iter().enumerate() {
            let color = if failed && idx > 0 {
                FAILED_COLOR
            } else {
                TEXT_COLOR
            };

            imgproc::put_text(
                &mut canvas,
                line,
                core::Point::new(10, 25 + 35 * idx as i32),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.8,
                scalar(color),
                2,
                imgproc::LINE_8,
                false,
            )?;
        }

        self.feed(&canvas)
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.release()
    }
}
