use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::Error;
use crate::Coord;

/// Single-object tracker driven frame by frame.
pub trait Tracker<F, T: Coord = i32> {
    fn init(&mut self, frame: &F, bbox: &BoundingBox<T>) -> Result<(), Error>;

    /// Locates the object in `frame`. `Ok(None)` means the tracker lost it on
    /// this frame, which is not an error.
    fn update(&mut self, frame: &F) -> Result<Option<BoundingBox<T>>, Error>;
}

impl<F, T: Coord, K: Tracker<F, T> + ?Sized> Tracker<F, T> for Box<K> {
    #[inline]
    fn init(&mut self, frame: &F, bbox: &BoundingBox<T>) -> Result<(), Error> {
        (**self).init(frame, bbox)
    }

    #[inline]
    fn update(&mut self, frame: &F) -> Result<Option<BoundingBox<T>>, Error> {
        (**self).update(frame)
    }
}

/// Tracking algorithms known by name.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackerKind {
    Mil,
    Boosting,
    Kcf,
    Tld,
    Mosse,
    Csrt,
    MedianFlow,
}

impl TrackerKind {
    pub const ALL: [TrackerKind; 7] = [
        TrackerKind::Mil,
        TrackerKind::Boosting,
        TrackerKind::Kcf,
        TrackerKind::Tld,
        TrackerKind::Mosse,
        TrackerKind::Csrt,
        TrackerKind::MedianFlow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TrackerKind::Mil => "MIL",
            TrackerKind::Boosting => "Boosting",
            TrackerKind::Kcf => "KCF",
            TrackerKind::Tld => "TLD",
            TrackerKind::Mosse => "MOSSE",
            TrackerKind::Csrt => "CSRT",
            TrackerKind::MedianFlow => "MedianFlow",
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("MF") {
            return Ok(TrackerKind::MedianFlow);
        }

        TrackerKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::TrackerUnavailable(s.to_string()))
    }
}

pub type TrackerCtor<F, T> = Box<dyn Fn() -> Result<Box<dyn Tracker<F, T>>, Error>>;

/// Name to constructor table; one instance is built at startup and handed to
/// whoever needs to create trackers.
pub struct TrackerRegistry<F, T: Coord = i32> {
    ctors: BTreeMap<String, TrackerCtor<F, T>>,
}

impl<F, T: Coord> TrackerRegistry<F, T> {
    pub fn new() -> Self {
        Self {
            ctors: BTreeMap::new(),
        }
    }

    /// Registers `ctor` under `name`; names are case-insensitive and a later
    /// registration replaces an earlier one.
    pub fn register<C>(&mut self, name: &str, ctor: C) -> &mut Self
    where
        C: Fn() -> Result<Box<dyn Tracker<F, T>>, Error> + 'static,
    {
        self.ctors.insert(name.to_ascii_lowercase(), Box::new(ctor));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ctors.contains_key(&name.to_ascii_lowercase())
    }

    /// Builds a fresh tracker, failing with [`Error::TrackerUnavailable`] for
    /// names nobody registered.
    pub fn create(&self, name: &str) -> Result<Box<dyn Tracker<F, T>>, Error> {
        let ctor = self
            .ctors
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::TrackerUnavailable(name.to_string()))?;

        ctor()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ctors.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ctors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ctors.is_empty()
    }
}

impl<F, T: Coord> Default for TrackerRegistry<F, T> {
    fn default() -> Self {
        Self::new()
    }
}
