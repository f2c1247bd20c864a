use mesh_types::BoundingBox;

/// Running min/max over observed points.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBoxAccumulator {
    min: [f64; 3],
    max: [f64; 3],
    count: usize,
}

impl Default for BoundingBoxAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBoxAccumulator {
    pub fn new() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
            count: 0,
        }
    }

    pub fn observe(&mut self, p: [f64; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The observed box, or [`BoundingBox::fallback`] if nothing was observed.
    pub fn finalize(&self) -> BoundingBox {
        if self.is_empty() {
            return BoundingBox::fallback();
        }
        BoundingBox {
            xmin: self.min[0],
            xmax: self.max[0],
            ymin: self.min[1],
            ymax: self.max[1],
            zmin: self.min[2],
            zmax: self.max[2],
        }
    }
}
