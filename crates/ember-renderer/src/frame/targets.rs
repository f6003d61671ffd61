//! Frame target descriptions, allocation and completeness checks.

use crate::constants::{gbuffer, point_shadow, shadow, ssao};
use crate::error::TargetError;
use crate::renderer::gpu_resources::{
    create_layered_render_texture, create_render_texture, format_bytes, texture_bytes,
};

/// The render targets owned by a frame resource set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    Shadow,
    PointShadow,
    GBuffer,
    SsaoRaw,
    SsaoBlur,
}

impl TargetId {
    pub const ALL: [TargetId; 5] = [
        TargetId::Shadow,
        TargetId::PointShadow,
        TargetId::GBuffer,
        TargetId::SsaoRaw,
        TargetId::SsaoBlur,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TargetId::Shadow => "Shadow",
            TargetId::PointShadow => "Point Shadow",
            TargetId::GBuffer => "GBuffer",
            TargetId::SsaoRaw => "SSAO",
            TargetId::SsaoBlur => "SSAO Blur",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// How a target's resolution is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSizing {
    /// Follows the viewport and is reallocated on resize.
    Viewport,
    /// Fixed resolution, unaffected by resize.
    Fixed { width: u32, height: u32 },
}

/// A declared attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub name: &'static str,
    pub format: wgpu::TextureFormat,
}

impl AttachmentDesc {
    pub const fn new(name: &'static str, format: wgpu::TextureFormat) -> Self {
        Self { name, format }
    }

    pub fn is_depth(&self) -> bool {
        self.format.is_depth_stencil_format()
    }
}

/// Declared layout of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTargetDesc {
    pub id: TargetId,
    pub sizing: TargetSizing,
    /// Array layers per attachment; 1 for plain 2D targets.
    pub layers: u32,
    pub attachments: Vec<AttachmentDesc>,
}

impl FrameTargetDesc {
    /// Resolution of the target for a viewport of `viewport` pixels.
    pub fn extent(&self, viewport: (u32, u32)) -> (u32, u32) {
        match self.sizing {
            TargetSizing::Viewport => viewport,
            TargetSizing::Fixed { width, height } => (width, height),
        }
    }

    pub fn follows_viewport(&self) -> bool {
        self.sizing == TargetSizing::Viewport
    }

    /// Bytes needed for every attachment at `viewport`.
    pub fn byte_size(&self, viewport: (u32, u32)) -> u64 {
        let (w, h) = self.extent(viewport);
        self.attachments
            .iter()
            .map(|a| w as u64 * h as u64 * self.layers as u64 * format_bytes(a.format))
            .sum()
    }

    /// Shadow depth, point shadow faces, G-buffer, raw SSAO and blurred SSAO.
    pub fn standard_layout(shadow_resolution: u32) -> Vec<FrameTargetDesc> {
        let shadow_size = shadow_resolution.clamp(shadow::MIN_RESOLUTION, shadow::MAX_RESOLUTION);
        vec![
            FrameTargetDesc {
                id: TargetId::Shadow,
                sizing: TargetSizing::Fixed {
                    width: shadow_size,
                    height: shadow_size,
                },
                layers: 1,
                attachments: vec![AttachmentDesc::new("depth", shadow::SHADOW_MAP_FORMAT)],
            },
            FrameTargetDesc {
                id: TargetId::PointShadow,
                sizing: TargetSizing::Fixed {
                    width: point_shadow::RESOLUTION,
                    height: point_shadow::RESOLUTION,
                },
                layers: point_shadow::FACES,
                attachments: vec![AttachmentDesc::new("depth", point_shadow::DEPTH_FORMAT)],
            },
            FrameTargetDesc {
                id: TargetId::GBuffer,
                sizing: TargetSizing::Viewport,
                layers: 1,
                attachments: vec![
                    AttachmentDesc::new("position", gbuffer::POSITION_FORMAT),
                    AttachmentDesc::new("normal", gbuffer::NORMAL_FORMAT),
                    AttachmentDesc::new("albedo", gbuffer::ALBEDO_FORMAT),
                    AttachmentDesc::new("depth", gbuffer::DEPTH_FORMAT),
                ],
            },
            FrameTargetDesc {
                id: TargetId::SsaoRaw,
                sizing: TargetSizing::Viewport,
                layers: 1,
                attachments: vec![AttachmentDesc::new("occlusion", ssao::OCCLUSION_FORMAT)],
            },
            FrameTargetDesc {
                id: TargetId::SsaoBlur,
                sizing: TargetSizing::Viewport,
                layers: 1,
                attachments: vec![AttachmentDesc::new("occlusion", ssao::OCCLUSION_FORMAT)],
            },
        ]
    }
}

/// What was actually allocated for an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub name: String,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

/// Checks that a target of `extent` fits the device before anything is
/// allocated.
pub fn check_limits(desc: &FrameTargetDesc, extent: (u32, u32), limits: &wgpu::Limits) -> Result<(), TargetError> {
    let max_dimension = limits.max_texture_dimension_2d;
    let max_layers = limits.max_texture_array_layers;
    if extent.0 > max_dimension || extent.1 > max_dimension || desc.layers > max_layers {
        return Err(TargetError::ExceedsLimit {
            target: desc.id.label().to_string(),
            size: extent,
            layers: desc.layers,
            max_dimension,
            max_layers,
        });
    }
    Ok(())
}

/// Checks that every declared attachment exists with the declared format,
/// layer count and the expected resolution.
pub fn check_completeness(
    desc: &FrameTargetDesc,
    expected: (u32, u32),
    allocated: &[AttachmentInfo],
) -> Result<(), TargetError> {
    let target = desc.id.label().to_string();
    if expected.0 == 0 || expected.1 == 0 {
        return Err(TargetError::ZeroSized { target });
    }

    for declared in &desc.attachments {
        let Some(info) = allocated.iter().find(|a| a.name == declared.name) else {
            return Err(TargetError::MissingAttachment {
                target,
                attachment: declared.name.to_string(),
            });
        };
        if info.format != declared.format {
            return Err(TargetError::FormatMismatch {
                target,
                attachment: declared.name.to_string(),
                expected: declared.format,
                actual: info.format,
            });
        }
        if (info.width, info.height) != expected {
            return Err(TargetError::SizeMismatch {
                target,
                attachment: declared.name.to_string(),
                expected,
                actual: (info.width, info.height),
            });
        }
        if info.layers != desc.layers {
            return Err(TargetError::LayerMismatch {
                target,
                attachment: declared.name.to_string(),
                expected: desc.layers,
                actual: info.layers,
            });
        }
    }
    Ok(())
}

/// An allocated attachment texture.
pub struct Attachment {
    pub info: AttachmentInfo,
    pub texture: wgpu::Texture,
    /// View over every layer (`D2Array` for layered targets).
    pub view: wgpu::TextureView,
    /// One 2D view per layer of a layered target; empty otherwise.
    pub layer_views: Vec<wgpu::TextureView>,
}

impl Attachment {
    fn create(device: &wgpu::Device, desc: &FrameTargetDesc, attachment: &AttachmentDesc, extent: (u32, u32)) -> Self {
        let label = format!("{} {}", desc.id.label(), attachment.name);
        let (width, height) = extent;
        let (texture, view, layer_views) = if desc.layers > 1 {
            create_layered_render_texture(device, &label, attachment.format, width, height, desc.layers)
        } else {
            let (texture, view) = create_render_texture(device, &label, attachment.format, width, height);
            (texture, view, Vec::new())
        };
        let size = texture.size();
        Self {
            info: AttachmentInfo {
                name: attachment.name.to_string(),
                format: texture.format(),
                width: size.width,
                height: size.height,
                layers: size.depth_or_array_layers,
            },
            texture,
            view,
            layer_views,
        }
    }
}

/// An allocated target: a set of attachments sharing one resolution.
pub struct FrameTarget {
    desc: FrameTargetDesc,
    width: u32,
    height: u32,
    attachments: Vec<Attachment>,
    complete: bool,
}

impl FrameTarget {
    /// Allocates every attachment of `desc` and checks completeness.
    ///
    /// Sizes past the device limits are rejected before any texture is
    /// created. Allocation runs under validation and out-of-memory error
    /// scopes so a failure is returned instead of reaching the device's
    /// uncaptured error handler.
    pub fn allocate(device: &wgpu::Device, desc: &FrameTargetDesc, viewport: (u32, u32)) -> Result<Self, TargetError> {
        let (width, height) = desc.extent(viewport);
        if width == 0 || height == 0 {
            return Err(TargetError::ZeroSized {
                target: desc.id.label().to_string(),
            });
        }
        check_limits(desc, (width, height), &device.limits())?;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let attachments: Vec<Attachment> = desc
            .attachments
            .iter()
            .map(|a| Attachment::create(device, desc, a, (width, height)))
            .collect();
        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(TargetError::Allocation {
                target: desc.id.label().to_string(),
                message: err.to_string(),
            });
        }

        let infos: Vec<AttachmentInfo> = attachments.iter().map(|a| a.info.clone()).collect();
        check_completeness(desc, (width, height), &infos)?;

        tracing::debug!(
            target_name = desc.id.label(),
            width,
            height,
            layers = desc.layers,
            "Allocated frame target"
        );

        Ok(Self {
            desc: desc.clone(),
            width,
            height,
            attachments,
            complete: true,
        })
    }

    /// Allocates `desc`, falling back to an incomplete 1x1 stand-in when
    /// allocation fails so bind groups can still be built.
    pub fn allocate_or_placeholder(device: &wgpu::Device, desc: &FrameTargetDesc, viewport: (u32, u32)) -> Self {
        Self::allocate(device, desc, viewport).unwrap_or_else(|err| {
            tracing::warn!(%err, "Frame target incomplete; dependent passes disabled");
            let attachments = desc
                .attachments
                .iter()
                .map(|a| Attachment::create(device, desc, a, (1, 1)))
                .collect();
            Self {
                desc: desc.clone(),
                width: 1,
                height: 1,
                attachments,
                complete: false,
            }
        })
    }

    /// Marks the target incomplete. Its textures stay alive, so bind groups
    /// built from it remain valid while dependent stages are skipped.
    pub fn invalidate(&mut self) {
        self.complete = false;
    }

    pub fn id(&self) -> TargetId {
        self.desc.id
    }

    pub fn desc(&self) -> &FrameTargetDesc {
        &self.desc
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.info.name == name)
    }

    /// View of a declared attachment.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not one of the target's declared attachments.
    pub fn view(&self, name: &str) -> &wgpu::TextureView {
        match self.attachment(name) {
            Some(a) => &a.view,
            None => panic!("target '{}' has no attachment '{name}'", self.desc.id.label()),
        }
    }

    /// 2D view of one layer of a layered attachment.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not declared or the target has no such layer.
    pub fn layer_view(&self, name: &str, layer: u32) -> &wgpu::TextureView {
        match self.attachment(name).and_then(|a| a.layer_views.get(layer as usize)) {
            Some(view) => view,
            None => panic!(
                "target '{}' has no layer {layer} in attachment '{name}'",
                self.desc.id.label()
            ),
        }
    }

    pub fn memory_bytes(&self) -> u64 {
        self.attachments.iter().map(|a| texture_bytes(&a.texture)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, format: wgpu::TextureFormat, w: u32, h: u32) -> AttachmentInfo {
        AttachmentInfo {
            name: name.to_string(),
            format,
            width: w,
            height: h,
            layers: 1,
        }
    }

    fn gbuffer() -> FrameTargetDesc {
        FrameTargetDesc::standard_layout(2048)
            .into_iter()
            .find(|d| d.id == TargetId::GBuffer)
            .unwrap()
    }

    fn gbuffer_infos(w: u32, h: u32) -> Vec<AttachmentInfo> {
        gbuffer()
            .attachments
            .iter()
            .map(|a| info(a.name, a.format, w, h))
            .collect()
    }

    #[test]
    fn test_resize_changes_only_viewport_targets() {
        let layout = FrameTargetDesc::standard_layout(2048);
        let before: Vec<_> = layout.iter().map(|d| d.extent((800, 600))).collect();
        let after: Vec<_> = layout.iter().map(|d| d.extent((1920, 1080))).collect();

        for (desc, (b, a)) in layout.iter().zip(before.iter().zip(&after)) {
            if desc.follows_viewport() {
                assert_eq!(*b, (800, 600));
                assert_eq!(*a, (1920, 1080));
            } else {
                assert_eq!(b, a);
            }
        }
        assert_eq!(layout[0].extent((1920, 1080)), (2048, 2048));
    }

    #[test]
    fn test_point_shadow_target_has_six_fixed_faces() {
        let layout = FrameTargetDesc::standard_layout(2048);
        let desc = layout.iter().find(|d| d.id == TargetId::PointShadow).unwrap();
        assert!(!desc.follows_viewport());
        assert_eq!(desc.layers, 6);
        assert_eq!(desc.extent((1, 1)), (1024, 1024));
        assert_eq!(desc.byte_size((1, 1)), 1024 * 1024 * 6 * 4);
    }

    #[test]
    fn test_layer_count_mismatch() {
        let layout = FrameTargetDesc::standard_layout(2048);
        let desc = layout.iter().find(|d| d.id == TargetId::PointShadow).unwrap();
        let single = [info("depth", point_shadow::DEPTH_FORMAT, 1024, 1024)];
        assert!(matches!(
            check_completeness(desc, (1024, 1024), &single),
            Err(TargetError::LayerMismatch { expected: 6, actual: 1, .. })
        ));

        let layered = [AttachmentInfo { layers: 6, ..single[0].clone() }];
        assert!(check_completeness(desc, (1024, 1024), &layered).is_ok());
    }

    #[test]
    fn test_limits_reject_oversized_viewport() {
        let limits = wgpu::Limits::default();
        let max = limits.max_texture_dimension_2d;
        assert!(check_limits(&gbuffer(), (max, 64), &limits).is_ok());
        assert!(matches!(
            check_limits(&gbuffer(), (max + 1, 64), &limits),
            Err(TargetError::ExceedsLimit { size, .. }) if size == (max + 1, 64)
        ));
        assert!(check_limits(&gbuffer(), (64, max + 1), &limits).is_err());
    }

    #[test]
    fn test_limits_reject_too_many_layers() {
        let limits = wgpu::Limits {
            max_texture_array_layers: 4,
            ..wgpu::Limits::default()
        };
        let layout = FrameTargetDesc::standard_layout(2048);
        let desc = layout.iter().find(|d| d.id == TargetId::PointShadow).unwrap();
        assert!(check_limits(desc, (1024, 1024), &limits).is_err());
    }

    #[test]
    fn test_shadow_resolution_is_clamped() {
        let layout = FrameTargetDesc::standard_layout(16);
        assert_eq!(layout[0].extent((1, 1)), (256, 256));
    }

    #[test]
    fn test_complete_gbuffer() {
        assert!(check_completeness(&gbuffer(), (800, 600), &gbuffer_infos(800, 600)).is_ok());
    }

    #[test]
    fn test_missing_attachment() {
        let mut infos = gbuffer_infos(800, 600);
        infos.retain(|i| i.name != "normal");
        assert_eq!(
            check_completeness(&gbuffer(), (800, 600), &infos),
            Err(TargetError::MissingAttachment {
                target: "GBuffer".into(),
                attachment: "normal".into()
            })
        );
    }

    #[test]
    fn test_stale_attachment_size() {
        let mut infos = gbuffer_infos(1920, 1080);
        infos[2] = info("albedo", gbuffer::ALBEDO_FORMAT, 800, 600);
        assert!(matches!(
            check_completeness(&gbuffer(), (1920, 1080), &infos),
            Err(TargetError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_format() {
        let mut infos = gbuffer_infos(64, 64);
        infos[0].format = wgpu::TextureFormat::Rgba8Unorm;
        assert!(matches!(
            check_completeness(&gbuffer(), (64, 64), &infos),
            Err(TargetError::FormatMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_sized_target() {
        assert!(matches!(
            check_completeness(&gbuffer(), (0, 600), &gbuffer_infos(0, 600)),
            Err(TargetError::ZeroSized { .. })
        ));
    }

    #[test]
    fn test_byte_size() {
        // position 8 + normal 8 + albedo 4 + depth 4 bytes per pixel
        assert_eq!(gbuffer().byte_size((10, 10)), 2400);
    }
}
