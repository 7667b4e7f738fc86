//! Stage region compaction (spec §4.F): packs source/destination byte
//! ranges into a minimum-size staging buffer layout.

use ash::vk;

/// Block footprint of a format: texel-block width, height, and bytes per
/// block. Uncompressed formats have a 1x1 block.
fn format_block(format: vk::Format) -> (u32, u32, u32) {
    match format {
        vk::Format::R8_UNORM | vk::Format::R8_UINT | vk::Format::R8_SNORM | vk::Format::R8_SINT | vk::Format::S8_UINT => (1, 1, 1),
        vk::Format::R8G8_UNORM | vk::Format::R8G8_UINT | vk::Format::R16_UNORM | vk::Format::R16_SFLOAT | vk::Format::D16_UNORM => (1, 1, 2),
        vk::Format::R8G8B8A8_UNORM
        | vk::Format::R8G8B8A8_SRGB
        | vk::Format::B8G8R8A8_UNORM
        | vk::Format::B8G8R8A8_SRGB
        | vk::Format::R16G16_SFLOAT
        | vk::Format::R32_SFLOAT
        | vk::Format::R32_UINT
        | vk::Format::D32_SFLOAT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::A2B10G10R10_UNORM_PACK32 => (1, 1, 4),
        vk::Format::D32_SFLOAT_S8_UINT => (1, 1, 8),
        vk::Format::R16G16B16A16_SFLOAT | vk::Format::R16G16B16A16_UNORM | vk::Format::R32G32_SFLOAT | vk::Format::D16_UNORM_S8_UINT => (1, 1, 8),
        vk::Format::R32G32B32A32_SFLOAT | vk::Format::R32G32B32_SFLOAT => (1, 1, 16),
        vk::Format::BC1_RGBA_UNORM_BLOCK | vk::Format::BC1_RGBA_SRGB_BLOCK | vk::Format::BC1_RGB_UNORM_BLOCK | vk::Format::BC1_RGB_SRGB_BLOCK | vk::Format::BC4_UNORM_BLOCK => {
            (4, 4, 8)
        }
        vk::Format::BC3_UNORM_BLOCK
        | vk::Format::BC3_SRGB_BLOCK
        | vk::Format::BC5_UNORM_BLOCK
        | vk::Format::BC5_SNORM_BLOCK
        | vk::Format::BC7_UNORM_BLOCK
        | vk::Format::BC7_SRGB_BLOCK => (4, 4, 16),
        // Unknown format: assume a single byte per texel rather than panic.
        _ => (1, 1, 1),
    }
}

/// True byte size of a whole image resource (spec §4.F, §8): block-aligned
/// footprint times depth and array layers, not the caller's say-so.
pub fn true_image_byte_size(format: vk::Format, width: u32, height: u32, depth: u32, layers: u32) -> u64 {
    let (block_w, block_h, bytes_per_block) = format_block(format);
    let blocks_x = (width as u64 + block_w as u64 - 1) / block_w as u64;
    let blocks_y = (height as u64 + block_h as u64 - 1) / block_h as u64;
    blocks_x * blocks_y * depth.max(1) as u64 * layers.max(1) as u64 * bytes_per_block as u64
}

/// One region to be staged: its true byte size (already accounting for
/// image block-size/aspect/layer semantics when applicable) and, for
/// buffer-shaped resources, the device byte offset it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRegion {
    /// True byte size of this region.
    pub byte_size: u64,
    /// Device byte offset, when the resource is linearly addressable (a
    /// buffer). `None` for image regions, which compact by insertion order
    /// instead since they have no single shared linear address space.
    pub device_offset: Option<u64>,
}

/// A region's position within the compacted staging buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactedRegion {
    /// Offset within the staging buffer.
    pub staging_offset: u64,
    /// True byte size (same as the input region's).
    pub byte_size: u64,
}

/// Compute a compacted staging layout for `regions`, preserving the input
/// order in the returned vector. When every region carries a device offset,
/// gaps between them are subtracted so offsets become contiguous; otherwise
/// regions are packed back-to-back in input order.
///
/// Returns the per-region layout (same length and order as `regions`) and
/// the total staging buffer size required.
pub fn compact_regions(regions: &[StageRegion]) -> (Vec<CompactedRegion>, u64) {
    if regions.is_empty() {
        return (Vec::new(), 0);
    }

    if regions.iter().all(|r| r.device_offset.is_some()) {
        compact_by_offset(regions)
    } else {
        compact_sequential(regions)
    }
}

fn compact_by_offset(regions: &[StageRegion]) -> (Vec<CompactedRegion>, u64) {
    let mut order: Vec<usize> = (0..regions.len()).collect();
    order.sort_by_key(|&i| regions[i].device_offset.unwrap());

    let mut out = vec![
        CompactedRegion {
            staging_offset: 0,
            byte_size: 0
        };
        regions.len()
    ];

    let mut cumulative_gap: u64 = 0;
    let mut prev_end: u64 = 0;
    for &i in &order {
        let region = regions[i];
        let start = region.device_offset.unwrap();
        let gap = start.saturating_sub(prev_end);
        cumulative_gap += gap;
        let staging_offset = start.saturating_sub(cumulative_gap);
        out[i] = CompactedRegion { staging_offset, byte_size: region.byte_size };
        prev_end = start + region.byte_size;
    }

    let total = prev_end.saturating_sub(cumulative_gap);
    (out, total)
}

fn compact_sequential(regions: &[StageRegion]) -> (Vec<CompactedRegion>, u64) {
    let mut offset = 0u64;
    let mut out = Vec::with_capacity(regions.len());
    for region in regions {
        out.push(CompactedRegion { staging_offset: offset, byte_size: region.byte_size });
        offset += region.byte_size;
    }
    (out, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_gapped_buffer_regions_compact_to_contiguous_offsets() {
        let regions = [
            StageRegion { byte_size: 100, device_offset: Some(0) },
            StageRegion { byte_size: 100, device_offset: Some(200) },
            StageRegion { byte_size: 100, device_offset: Some(400) },
        ];
        let (out, total) = compact_regions(&regions);
        assert_eq!(out.iter().map(|r| r.staging_offset).collect::<Vec<_>>(), vec![0, 100, 200]);
        assert_eq!(total, 300);
    }

    #[test]
    fn already_contiguous_regions_are_unchanged() {
        let regions = [
            StageRegion { byte_size: 50, device_offset: Some(0) },
            StageRegion { byte_size: 50, device_offset: Some(50) },
        ];
        let (out, total) = compact_regions(&regions);
        assert_eq!(out[0].staging_offset, 0);
        assert_eq!(out[1].staging_offset, 50);
        assert_eq!(total, 100);
    }

    #[test]
    fn out_of_order_input_still_compacts_correctly_and_preserves_input_order() {
        let regions = [
            StageRegion { byte_size: 100, device_offset: Some(400) },
            StageRegion { byte_size: 100, device_offset: Some(0) },
            StageRegion { byte_size: 100, device_offset: Some(200) },
        ];
        let (out, total) = compact_regions(&regions);
        // Input order preserved: index 0 is the {400..500} region, etc.
        assert_eq!(out[0].staging_offset, 200);
        assert_eq!(out[1].staging_offset, 0);
        assert_eq!(out[2].staging_offset, 100);
        assert_eq!(total, 300);
    }

    #[test]
    fn image_regions_without_device_offset_pack_sequentially() {
        let regions = [
            StageRegion { byte_size: 64, device_offset: None },
            StageRegion { byte_size: 32, device_offset: None },
        ];
        let (out, total) = compact_regions(&regions);
        assert_eq!(out[0].staging_offset, 0);
        assert_eq!(out[1].staging_offset, 64);
        assert_eq!(total, 96);
    }

    #[test]
    fn empty_input_yields_empty_output_and_zero_size() {
        let (out, total) = compact_regions(&[]);
        assert!(out.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn true_image_byte_size_uncompressed_is_width_height_depth_layers_times_texel_size() {
        assert_eq!(true_image_byte_size(vk::Format::R8G8B8A8_UNORM, 16, 16, 1, 1), 16 * 16 * 4);
        assert_eq!(true_image_byte_size(vk::Format::R8G8B8A8_UNORM, 16, 16, 1, 4), 16 * 16 * 4 * 4);
    }

    #[test]
    fn true_image_byte_size_block_compressed_rounds_up_to_whole_blocks() {
        // A 5x5 BC1 image still occupies 2x2 blocks (4x4 texels each).
        assert_eq!(true_image_byte_size(vk::Format::BC1_RGBA_UNORM_BLOCK, 5, 5, 1, 1), 2 * 2 * 8);
        assert_eq!(true_image_byte_size(vk::Format::BC7_UNORM_BLOCK, 8, 8, 1, 1), 2 * 2 * 16);
    }
}
