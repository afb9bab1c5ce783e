use graphlens_graph::Vec2;

/// Pan and zoom transform between world and screen coordinates.
///
/// `screen = world * scale + translation`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    width: f32,
    height: f32,
    scale: f32,
    translation: Vec2,
    zoom_min: f32,
    zoom_max: f32,
    zoom_step: f32,
}

impl Viewport {
    /// A viewport with the world origin at the centre of the surface.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            scale: 1.0,
            translation: Vec2::new(width / 2.0, height / 2.0),
            zoom_min: 0.1,
            zoom_max: 2.0,
            zoom_step: 1.3,
        }
    }

    pub fn with_zoom_limits(mut self, min: f32, max: f32, step: f32) -> Self {
        self.zoom_min = min.min(max);
        self.zoom_max = max.max(min);
        self.zoom_step = step.max(1.0);
        self.scale = self.scale.clamp(self.zoom_min, self.zoom_max);
        self
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn translation(&self) -> Vec2 {
        self.translation
    }

    pub fn zoom_step(&self) -> f32 {
        self.zoom_step
    }

    pub fn can_zoom_in(&self) -> bool {
        self.scale < self.zoom_max
    }

    pub fn can_zoom_out(&self) -> bool {
        self.scale > self.zoom_min
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world * self.scale + self.translation
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.translation) / self.scale
    }

    fn centre(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Keep the world point under the old surface centre centred.
    pub fn resize(&mut self, width: f32, height: f32) {
        let focus = self.screen_to_world(self.centre());
        self.width = width;
        self.height = height;
        self.translation = self.centre() - focus * self.scale;
    }

    pub fn pan_by(&mut self, screen_delta: Vec2) {
        self.translation += screen_delta;
    }

    /// Multiply the scale by `factor`, keeping `anchor` (screen) fixed.
    /// Returns whether the scale changed.
    pub fn zoom_at(&mut self, factor: f32, anchor: Vec2) -> bool {
        let scale = (self.scale * factor).clamp(self.zoom_min, self.zoom_max);
        if scale == self.scale || !scale.is_finite() {
            return false;
        }
        let focus = self.screen_to_world(anchor);
        self.scale = scale;
        self.translation = anchor - focus * scale;
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom_at(self.zoom_step, self.centre())
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom_at(1.0 / self.zoom_step, self.centre())
    }

    /// Fit the world rectangle `min..max` into the surface with `padding` pixels
    /// on each side. Never zooms in past 1.0.
    pub fn zoom_to_fit(&mut self, min: Vec2, max: Vec2, padding: f32) {
        let size = max - min;
        let room = Vec2::new(
            (self.width - 2.0 * padding).max(1.0),
            (self.height - 2.0 * padding).max(1.0),
        );
        let fit = if size.x <= 0.0 && size.y <= 0.0 {
            1.0
        } else {
            (room.x / size.x.max(f32::EPSILON)).min(room.y / size.y.max(f32::EPSILON))
        };
        self.scale = fit.min(1.0).clamp(self.zoom_min, self.zoom_max);
        let focus = (min + max) * 0.5;
        self.translation = self.centre() - focus * self.scale;
    }

    /// SVG `transform` attribute value for the world layer.
    pub fn svg_transform(&self) -> String {
        format!(
            "translate({} {}) scale({})",
            self.translation.x, self.translation.y, self.scale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-3
    }

    #[test]
    fn test_origin_starts_centred() {
        let viewport = Viewport::new(800.0, 600.0);
        assert_eq!(viewport.world_to_screen(Vec2::ZERO), Vec2::new(400.0, 300.0));
        assert_eq!(viewport.screen_to_world(Vec2::new(400.0, 300.0)), Vec2::ZERO);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut viewport = Viewport::new(800.0, 600.0);
        let anchor = Vec2::new(100.0, 50.0);
        let before = viewport.screen_to_world(anchor);
        assert!(viewport.zoom_at(1.3, anchor));
        assert!(close(viewport.screen_to_world(anchor), before));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut viewport = Viewport::new(800.0, 600.0).with_zoom_limits(0.5, 2.0, 2.0);
        assert!(viewport.zoom_in());
        assert!(!viewport.zoom_in());
        assert_eq!(viewport.scale(), 2.0);
        assert!(!viewport.can_zoom_in());

        assert!(viewport.zoom_out());
        assert!(viewport.zoom_out());
        assert!(!viewport.zoom_out());
        assert_eq!(viewport.scale(), 0.5);
    }

    #[test]
    fn test_zoom_to_fit_centres_bounds() {
        let mut viewport = Viewport::new(400.0, 400.0);
        viewport.zoom_to_fit(Vec2::new(0.0, 0.0), Vec2::new(1000.0, 500.0), 0.0);
        assert!((viewport.scale() - 0.4).abs() < 1e-4);
        assert!(close(
            viewport.world_to_screen(Vec2::new(500.0, 250.0)),
            Vec2::new(200.0, 200.0)
        ));
    }

    #[test]
    fn test_resize_keeps_focus() {
        let mut viewport = Viewport::new(400.0, 400.0);
        viewport.pan_by(Vec2::new(30.0, -10.0));
        let focus = viewport.screen_to_world(Vec2::new(200.0, 200.0));
        viewport.resize(1000.0, 600.0);
        assert!(close(
            viewport.screen_to_world(Vec2::new(500.0, 300.0)),
            focus
        ));
    }
}
