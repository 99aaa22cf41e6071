use crate::bbox::BoundingBox;
use crate::error::Error;
use crate::evaluator::Outcome;
use crate::Coord;

/// What the evaluator knows about one frame when handing it to a renderer.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a, T: Coord = i32> {
    pub frame: usize,
    pub annotation: Option<&'a BoundingBox<T>>,
    /// `None` for the initialisation frame and frames between checkpoints
    pub outcome: Option<&'a Outcome<T>>,
}

impl<'a, T: Coord> Overlay<'a, T> {
    /// Text lines drawn over the frame, prefixed with `label`.
    pub fn lines(&self, label: &str) -> Vec<String> {
        let mut lines = vec![format!("{} No.{} frame", label, self.frame)];

        match self.outcome {
            Some(Outcome::Tracked { score, .. }) => {
                lines.push(format!("IoU: {:.6}", score.iou));
                lines.push(format!("unbiased IoU: {:.6}", score.unbiased_iou));
            }
            Some(Outcome::Failed) => lines.push("Tracking failed!".to_string()),
            None => {}
        }

        lines
    }
}

/// Consumer of annotated frames, e.g. a video encoder.
pub trait Renderer<F, T: Coord = i32> {
    fn render(&mut self, frame: &F, overlay: &Overlay<'_, T>) -> Result<(), Error>;

    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
