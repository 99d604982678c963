//! Joint angles and movement-stability checks shared by the analyzers.

use std::collections::VecDeque;

use crate::pose::Landmark;

/// Planar angle at `b` between rays b→a and b→c, in degrees [0, 180].
///
/// Only x/y are used. Returns 0 when `a` or `c` coincides with `b`.
pub fn angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let (ax, ay) = (a.x - b.x, a.y - b.y);
    let (cx, cy) = (c.x - b.x, c.y - b.y);
    if (ax == 0.0 && ay == 0.0) || (cx == 0.0 && cy == 0.0) {
        return 0.0;
    }

    let radians = f32::atan2(cy, cx) - f32::atan2(ay, ax);
    let degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}

/// True when the excursion (max - min) on both axes stays strictly below
/// `threshold`. An empty window counts as stable.
pub fn is_stable<I>(points: I, threshold: f32) -> bool
where
    I: IntoIterator<Item = [f32; 2]>,
{
    let mut iter = points.into_iter();
    let Some(first) = iter.next() else {
        return true;
    };

    let (mut min, mut max) = (first, first);
    for p in iter {
        for axis in 0..2 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    (0..2).all(|axis| max[axis] - min[axis] < threshold)
}

/// Samples collected over one candidate rep.
///
/// Bounded: once `capacity` is reached the oldest sample is dropped, so a rep
/// that never completes cannot grow without limit.
#[derive(Debug, Clone)]
pub struct SampleWindow<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> SampleWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, sample: T) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.samples.iter().copied()
    }
}

impl SampleWindow<[f32; 2]> {
    pub fn is_stable(&self, threshold: f32) -> bool {
        is_stable(self.iter(), threshold)
    }
}

impl SampleWindow<f32> {
    /// Peak value, `None` when empty
    pub fn max(&self) -> Option<f32> {
        self.iter().fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
    }
}
