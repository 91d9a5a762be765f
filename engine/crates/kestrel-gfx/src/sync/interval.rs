//! 资源子区间
//!
//! buffer 使用一维的字节区间；image 使用 (aspect, mip, layer) 三个维度构成的盒子。

use ash::vk;

/// buffer 中的字节区间 `[offset, offset + size)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferInterval {
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

impl BufferInterval {
    #[inline]
    pub const fn new(offset: vk::DeviceSize, size: vk::DeviceSize) -> Self {
        Self { offset, size }
    }

    #[inline]
    pub fn end(&self) -> vk::DeviceSize {
        self.offset + self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }

    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.offset <= other.offset && other.end() <= self.end()
    }

    /// 重叠或者相邻时返回并集
    pub fn merge(&self, other: &Self) -> Option<Self> {
        if self.offset > other.end() || other.offset > self.end() {
            return None;
        }
        let offset = self.offset.min(other.offset);
        Some(Self::new(offset, self.end().max(other.end()) - offset))
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let offset = self.offset.max(other.offset);
        Some(Self::new(offset, self.end().min(other.end()) - offset))
    }

    /// `self - other`，结果最多两段
    pub fn difference(&self, other: &Self) -> Vec<Self> {
        if !self.overlaps(other) {
            return vec![*self];
        }

        let mut pieces = Vec::with_capacity(2);
        if self.offset < other.offset {
            pieces.push(Self::new(self.offset, other.offset - self.offset));
        }
        if other.end() < self.end() {
            pieces.push(Self::new(other.end(), self.end() - other.end()));
        }
        pieces
    }
}

/// image 的子资源区间
///
/// aspect 被视为一个集合维度，mip 和 layer 是连续区间。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageInterval {
    pub aspect: vk::ImageAspectFlags,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

// new & 转换
impl ImageInterval {
    #[inline]
    pub const fn new(aspect: vk::ImageAspectFlags, mips: (u32, u32), layers: (u32, u32)) -> Self {
        Self {
            aspect,
            base_mip_level: mips.0,
            level_count: mips.1,
            base_array_layer: layers.0,
            layer_count: layers.1,
        }
    }

    /// `REMAINING_MIP_LEVELS` 和 `REMAINING_ARRAY_LAYERS` 无法在这里解析，调用者需要传入具体数量
    #[inline]
    pub fn from_range(range: &vk::ImageSubresourceRange) -> Self {
        debug_assert!(range.level_count != vk::REMAINING_MIP_LEVELS, "level count must be explicit");
        debug_assert!(range.layer_count != vk::REMAINING_ARRAY_LAYERS, "layer count must be explicit");
        Self {
            aspect: range.aspect_mask,
            base_mip_level: range.base_mip_level,
            level_count: range.level_count,
            base_array_layer: range.base_array_layer,
            layer_count: range.layer_count,
        }
    }

    #[inline]
    pub fn to_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: self.base_mip_level,
            level_count: self.level_count,
            base_array_layer: self.base_array_layer,
            layer_count: self.layer_count,
        }
    }
}

// 区间运算
impl ImageInterval {
    #[inline]
    pub fn mip_end(&self) -> u32 {
        self.base_mip_level + self.level_count
    }

    #[inline]
    pub fn layer_end(&self) -> u32 {
        self.base_array_layer + self.layer_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.aspect.is_empty() || self.level_count == 0 || self.layer_count == 0
    }

    #[inline]
    fn same_mips(&self, other: &Self) -> bool {
        self.base_mip_level == other.base_mip_level && self.level_count == other.level_count
    }

    #[inline]
    fn same_layers(&self, other: &Self) -> bool {
        self.base_array_layer == other.base_array_layer && self.layer_count == other.layer_count
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.aspect.intersects(other.aspect)
            && self.base_mip_level < other.mip_end()
            && other.base_mip_level < self.mip_end()
            && self.base_array_layer < other.layer_end()
            && other.base_array_layer < self.layer_end()
    }

    pub fn contains(&self, other: &Self) -> bool {
        self.aspect.contains(other.aspect)
            && self.base_mip_level <= other.base_mip_level
            && other.mip_end() <= self.mip_end()
            && self.base_array_layer <= other.base_array_layer
            && other.layer_end() <= self.layer_end()
    }

    /// 只有并集仍然是一个盒子时才返回
    pub fn merge(&self, other: &Self) -> Option<Self> {
        if self.contains(other) {
            return Some(*self);
        }
        if other.contains(self) {
            return Some(*other);
        }

        let touches = |a_begin: u32, a_end: u32, b_begin: u32, b_end: u32| a_begin <= b_end && b_begin <= a_end;

        if self.aspect == other.aspect && self.same_mips(other) {
            if touches(self.base_array_layer, self.layer_end(), other.base_array_layer, other.layer_end()) {
                let base = self.base_array_layer.min(other.base_array_layer);
                let end = self.layer_end().max(other.layer_end());
                return Some(Self::new(self.aspect, (self.base_mip_level, self.level_count), (base, end - base)));
            }
        } else if self.aspect == other.aspect && self.same_layers(other) {
            if touches(self.base_mip_level, self.mip_end(), other.base_mip_level, other.mip_end()) {
                let base = self.base_mip_level.min(other.base_mip_level);
                let end = self.mip_end().max(other.mip_end());
                return Some(Self::new(self.aspect, (base, end - base), (self.base_array_layer, self.layer_count)));
            }
        } else if self.same_mips(other) && self.same_layers(other) {
            return Some(Self { aspect: self.aspect | other.aspect, ..*self });
        }

        None
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let base_mip = self.base_mip_level.max(other.base_mip_level);
        let mip_end = self.mip_end().min(other.mip_end());
        let base_layer = self.base_array_layer.max(other.base_array_layer);
        let layer_end = self.layer_end().min(other.layer_end());
        Some(Self::new(self.aspect & other.aspect, (base_mip, mip_end - base_mip), (base_layer, layer_end - base_layer)))
    }

    /// `self - other`，结果是互不重叠的盒子，最多五个
    ///
    /// 先切掉 other 不包含的 aspect，再在公共 aspect 上切掉 mip 范围以外的部分，
    /// 最后在重叠的 mip 范围内切掉 layer 范围以外的部分。
    pub fn difference(&self, other: &Self) -> Vec<Self> {
        let Some(inter) = self.intersect(other) else {
            return vec![*self];
        };

        let mut pieces = Vec::new();
        let mut push = |piece: Self| {
            if !piece.is_empty() {
                pieces.push(piece);
            }
        };

        let self_mips = (self.base_mip_level, self.level_count);
        let self_layers = (self.base_array_layer, self.layer_count);

        push(Self::new(self.aspect & !other.aspect, self_mips, self_layers));

        let common = inter.aspect;
        push(Self::new(common, (self.base_mip_level, inter.base_mip_level - self.base_mip_level), self_layers));
        push(Self::new(common, (inter.mip_end(), self.mip_end() - inter.mip_end()), self_layers));

        let inter_mips = (inter.base_mip_level, inter.level_count);
        push(Self::new(
            common,
            inter_mips,
            (self.base_array_layer, inter.base_array_layer - self.base_array_layer),
        ));
        push(Self::new(common, inter_mips, (inter.layer_end(), self.layer_end() - inter.layer_end())));

        pieces
    }
}
