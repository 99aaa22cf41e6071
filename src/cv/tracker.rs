use opencv::{
    core::{Mat, Ptr, Rect},
    prelude::*,
    tracking, video,
};

use crate::bbox::BoundingBox;
use crate::error::Error;
use crate::tracker::{Tracker, TrackerKind, TrackerRegistry};

/// One of the OpenCV single-object trackers. Legacy algorithms are wrapped
/// into the current tracking API.
pub struct OpencvTracker {
    kind: TrackerKind,
    inner: Ptr<video::Tracker>,
}

impl OpencvTracker {
    pub fn new(kind: TrackerKind) -> Result<Self, Error> {
        let inner: Ptr<video::Tracker> = match kind {
            TrackerKind::Mil => video::TrackerMIL::create_def()?.into(),
            TrackerKind::Kcf => tracking::TrackerKCF::create_def()?.into(),
            TrackerKind::Csrt => tracking::TrackerCSRT::create_def()?.into(),
            TrackerKind::Boosting => {
                upgrade(tracking::legacy_TrackerBoosting::create_def()?.into())?
            }
            TrackerKind::Tld => upgrade(tracking::legacy_TrackerTLD::create_def()?.into())?,
            TrackerKind::Mosse => upgrade(tracking::legacy_TrackerMOSSE::create()?.into())?,
            TrackerKind::MedianFlow => {
                upgrade(tracking::legacy_TrackerMedianFlow::create_def()?.into())?
            }
        };

        Ok(Self { kind, inner })
    }

    #[inline]
    pub fn kind(&self) -> TrackerKind {
        self.kind
    }
}

fn upgrade(legacy: Ptr<tracking::legacy_Tracker>) -> Result<Ptr<video::Tracker>, Error> {
    Ok(tracking::upgrade_tracking_api(&legacy)?)
}

impl Tracker<Mat> for OpencvTracker {
    fn init(&mut self, frame: &Mat, bbox: &BoundingBox<i32>) -> Result<(), Error> {
        self.inner.init(frame, (*bbox).into())?;

        Ok(())
    }

    fn update(&mut self, frame: &Mat) -> Result<Option<BoundingBox<i32>>, Error> {
        let mut rect = Rect::default();
        let found = self.inner.update(frame, &mut rect)?;

        Ok(found.then(|| rect.into()))
    }
}

/// Registry of every OpenCV tracker, keyed by [`TrackerKind`] name plus the
/// `MF` shorthand for median flow.
pub fn opencv_registry() -> TrackerRegistry<Mat> {
    let mut registry = TrackerRegistry::new();

    for kind in TrackerKind::ALL {
        registry.register(kind.name(), move || {
            Ok(Box::new(OpencvTracker::new(kind)?) as Box<dyn Tracker<Mat>>)
        });
    }

    registry.register("MF", || {
        Ok(Box::new(OpencvTracker::new(TrackerKind::MedianFlow)?) as Box<dyn Tracker<Mat>>)
    });

    registry
}
