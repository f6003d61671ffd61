//! Stage kinds and their fixed frame order.

/// Kind of a pipeline stage. Stages always execute in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    /// Depth-only render from the primary directional light
    Shadow,
    /// G-buffer fill (position, normal, albedo, depth)
    Geometry,
    /// Raw ambient occlusion from the G-buffer
    Ssao,
    /// Box blur of the raw occlusion
    SsaoBlur,
    /// Deferred lighting into the output view
    Lighting,
    /// Bounding boxes and light markers over the lit image
    DebugOverlay,
}

impl StageKind {
    pub const ALL: [StageKind; 6] = [
        StageKind::Shadow,
        StageKind::Geometry,
        StageKind::Ssao,
        StageKind::SsaoBlur,
        StageKind::Lighting,
        StageKind::DebugOverlay,
    ];

    /// Position of the stage within a frame.
    pub fn order(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            StageKind::Shadow => "Shadow Pass",
            StageKind::Geometry => "Geometry Pass",
            StageKind::Ssao => "SSAO Pass",
            StageKind::SsaoBlur => "SSAO Blur Pass",
            StageKind::Lighting => "Lighting Pass",
            StageKind::DebugOverlay => "Debug Overlay Pass",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_declaration() {
        let orders: Vec<usize> = StageKind::ALL.iter().map(|k| k.order()).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4, 5]);
        assert!(StageKind::Shadow < StageKind::DebugOverlay);
    }
}
