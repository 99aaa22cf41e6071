use crate::error::Error;
use crate::frame::Frame;

/// Pull-based producer of frames, read one at a time in video order.
pub trait FrameSource {
    type Frame: Frame;

    /// Next frame, `None` once the source is exhausted.
    fn read_next(&mut self) -> Result<Option<Self::Frame>, Error>;

    /// Nominal number of frames. Containers may report it wrongly, so it is
    /// only a hint.
    fn frame_count(&self) -> Option<usize> {
        None
    }

    fn dims(&self) -> Option<(u32, u32)> {
        None
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    type Frame = S::Frame;

    #[inline]
    fn read_next(&mut self) -> Result<Option<Self::Frame>, Error> {
        (**self).read_next()
    }

    #[inline]
    fn frame_count(&self) -> Option<usize> {
        (**self).frame_count()
    }

    #[inline]
    fn dims(&self) -> Option<(u32, u32)> {
        (**self).dims()
    }
}

/// Per-frame pixel transform applied before the tracker sees the frame.
pub trait FrameFilter<F> {
    fn apply(&self, frame: F) -> Result<F, Error>;
}

/// Source adapter running every frame through a chain of filters.
pub struct Filtered<S: FrameSource> {
    inner: S,
    filters: Vec<Box<dyn FrameFilter<S::Frame>>>,
}

impl<S: FrameSource> Filtered<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            filters: Vec::new(),
        }
    }

    pub fn with<X: FrameFilter<S::Frame> + 'static>(mut self, filter: X) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: FrameSource> FrameSource for Filtered<S> {
    type Frame = S::Frame;

    fn read_next(&mut self) -> Result<Option<Self::Frame>, Error> {
        let Some(mut frame) = self.inner.read_next()? else {
            return Ok(None);
        };

        for filter in &self.filters {
            frame = filter.apply(frame)?;
        }

        Ok(Some(frame))
    }

    #[inline]
    fn frame_count(&self) -> Option<usize> {
        self.inner.frame_count()
    }

    #[inline]
    fn dims(&self) -> Option<(u32, u32)> {
        self.inner.dims()
    }
}
