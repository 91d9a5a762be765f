//! 互不重叠的区间集合
//!
//! 每个集合内部的区间两两不重叠。`add` 会合并可以合并的区间，
//! `insert` 只追加，由调用者保证不重叠。

use itertools::Itertools;

use crate::sync::interval::{BufferInterval, ImageInterval};

/// 按 offset 排序的 buffer 区间集合
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferIntervalSet {
    intervals: Vec<BufferInterval>,
}

impl BufferIntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入区间，与重叠或相邻的区间合并
    pub fn add(&mut self, interval: BufferInterval) {
        if interval.is_empty() {
            return;
        }

        let mut merged = interval;
        self.intervals.retain(|existing| match merged.merge(existing) {
            Some(union) => {
                merged = union;
                false
            }
            None => true,
        });
        self.insert(merged);
    }

    /// 加入区间，不做合并
    pub fn insert(&mut self, interval: BufferInterval) {
        if interval.is_empty() {
            return;
        }
        debug_assert!(!self.has_overlap(&interval), "interval {interval:?} overlaps the set");

        let pos = self.intervals.partition_point(|i| i.offset < interval.offset);
        self.intervals.insert(pos, interval);
    }

    /// 移除区间覆盖的部分，部分覆盖的区间会被切开
    pub fn remove(&mut self, interval: &BufferInterval) {
        if !self.has_overlap(interval) {
            return;
        }
        self.intervals = self.intervals.iter().flat_map(|i| i.difference(interval)).collect_vec();
    }

    pub fn find_overlapping(&self, interval: &BufferInterval) -> Vec<BufferInterval> {
        self.intervals.iter().filter(|i| i.overlaps(interval)).copied().collect()
    }

    #[inline]
    pub fn has_overlap(&self, interval: &BufferInterval) -> bool {
        self.intervals.iter().any(|i| i.overlaps(interval))
    }

    #[inline]
    pub fn intervals(&self) -> &[BufferInterval] {
        &self.intervals
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }
}

/// image 子资源区间集合
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageIntervalSet {
    intervals: Vec<ImageInterval>,
}

impl ImageIntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入区间
    ///
    /// 已经被覆盖的部分会被忽略，剩余部分尽量与已有区间合并成盒子。
    pub fn add(&mut self, interval: ImageInterval) {
        if interval.is_empty() {
            return;
        }

        let mut pieces = vec![interval];
        for existing in &self.intervals {
            if pieces.iter().any(|p| p.overlaps(existing)) {
                pieces = pieces.iter().flat_map(|p| p.difference(existing)).collect_vec();
            }
        }

        for piece in pieces {
            self.add_disjoint(piece);
        }
    }

    /// 加入区间，不做合并
    pub fn insert(&mut self, interval: ImageInterval) {
        if interval.is_empty() {
            return;
        }
        debug_assert!(!self.has_overlap(&interval), "interval {interval:?} overlaps the set");
        self.intervals.push(interval);
    }

    /// 合并后的区间可能又能和其他区间合并，因此循环到不再变化
    fn add_disjoint(&mut self, interval: ImageInterval) {
        let mut merged = interval;
        while let Some(pos) = self.intervals.iter().position(|existing| merged.merge(existing).is_some()) {
            let existing = self.intervals.swap_remove(pos);
            if let Some(union) = merged.merge(&existing) {
                merged = union;
            }
        }
        self.intervals.push(merged);
    }

    /// 移除区间覆盖的部分，部分覆盖的区间会被切开
    pub fn remove(&mut self, interval: &ImageInterval) {
        if !self.has_overlap(interval) {
            return;
        }
        self.intervals = self.intervals.iter().flat_map(|i| i.difference(interval)).collect_vec();
    }

    pub fn find_overlapping(&self, interval: &ImageInterval) -> Vec<ImageInterval> {
        self.intervals.iter().filter(|i| i.overlaps(interval)).copied().collect()
    }

    #[inline]
    pub fn has_overlap(&self, interval: &ImageInterval) -> bool {
        self.intervals.iter().any(|i| i.overlaps(interval))
    }

    #[inline]
    pub fn intervals(&self) -> &[ImageInterval] {
        &self.intervals
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }
}

#[cfg(test)]
mod tests {
    use ash::vk;

    use super::*;

    const COLOR: vk::ImageAspectFlags = vk::ImageAspectFlags::COLOR;

    #[test]
    fn test_buffer_set_coalesces() {
        let mut set = BufferIntervalSet::new();
        set.add(BufferInterval::new(128, 64));
        set.add(BufferInterval::new(0, 64));
        assert_eq!(set.len(), 2);
        assert_eq!(set.intervals()[0].offset, 0);

        set.add(BufferInterval::new(64, 64));
        assert_eq!(set.intervals(), &[BufferInterval::new(0, 192)]);
    }

    #[test]
    fn test_buffer_set_remove_splits() {
        let mut set = BufferIntervalSet::new();
        set.add(BufferInterval::new(0, 1024));
        set.remove(&BufferInterval::new(256, 256));
        assert_eq!(set.intervals(), &[BufferInterval::new(0, 256), BufferInterval::new(512, 512)]);

        set.remove(&BufferInterval::new(0, 4096));
        assert!(set.is_empty());
    }

    #[test]
    fn test_buffer_set_find_overlapping() {
        let mut set = BufferIntervalSet::new();
        set.insert(BufferInterval::new(0, 64));
        set.insert(BufferInterval::new(64, 64));
        set.insert(BufferInterval::new(256, 64));

        assert_eq!(set.len(), 3);
        assert_eq!(set.find_overlapping(&BufferInterval::new(32, 64)).len(), 2);
        assert!(!set.has_overlap(&BufferInterval::new(128, 128)));
    }

    #[test]
    fn test_image_set_merges_into_box() {
        let mut set = ImageIntervalSet::new();
        set.add(ImageInterval::new(COLOR, (0, 1), (0, 1)));
        set.add(ImageInterval::new(COLOR, (2, 1), (0, 1)));
        assert_eq!(set.len(), 2);

        // 填上中间的 mip 之后三段合并为一个盒子
        set.add(ImageInterval::new(COLOR, (1, 1), (0, 1)));
        assert_eq!(set.intervals(), &[ImageInterval::new(COLOR, (0, 3), (0, 1))]);
    }

    #[test]
    fn test_image_set_add_ignores_covered_part() {
        let mut set = ImageIntervalSet::new();
        set.add(ImageInterval::new(COLOR, (0, 2), (0, 2)));
        set.add(ImageInterval::new(COLOR, (1, 2), (1, 2)));

        let total: u32 = set.intervals().iter().map(|i| i.level_count * i.layer_count).sum();
        assert_eq!(total, 4 + 4 - 1);
        let intervals = set.intervals();
        for (i, a) in intervals.iter().enumerate() {
            for b in &intervals[i + 1..] {
                assert!(!a.overlaps(b));
            }
        }
    }

    #[test]
    fn test_image_set_remove_splits() {
        let mut set = ImageIntervalSet::new();
        set.add(ImageInterval::new(COLOR, (0, 3), (0, 1)));
        set.remove(&ImageInterval::new(COLOR, (1, 1), (0, 1)));

        assert_eq!(set.len(), 2);
        assert!(!set.has_overlap(&ImageInterval::new(COLOR, (1, 1), (0, 1))));
        assert!(set.has_overlap(&ImageInterval::new(COLOR, (0, 1), (0, 1))));
        assert!(set.has_overlap(&ImageInterval::new(COLOR, (2, 1), (0, 1))));
    }
}
