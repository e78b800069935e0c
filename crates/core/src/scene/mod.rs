use serde::{Deserialize, Serialize};

use crate::timeline::{Easing, Tween};

/// Identity of a piece of visual content in the content catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDescriptor {
    pub content_id: String,
}

/// Instantiated visual content placed on a carousel page.
///
/// The carousel owns each instance for the lifetime of its page and destroys
/// it explicitly when the page is removed. Rendering reads `placement_x`.
#[derive(Debug)]
pub struct ContentInstance {
    pub descriptor: ContentDescriptor,
    placement_x: f32,
    shift: Option<Tween>,
}

impl ContentInstance {
    pub fn new(content_id: impl Into<String>) -> Self {
        Self {
            descriptor: ContentDescriptor {
                content_id: content_id.into(),
            },
            placement_x: 0.0,
            shift: None,
        }
    }

    pub fn content_id(&self) -> &str {
        &self.descriptor.content_id
    }

    pub fn placement_x(&self) -> f32 {
        self.placement_x
    }

    /// Snaps the content to a horizontal position.
    pub fn place(&mut self, x: f32) {
        self.shift = None;
        self.placement_x = x;
    }

    /// Starts sliding the content to a new horizontal position.
    pub fn slide_to(&mut self, x: f32, duration: f32) {
        self.shift = Some(Tween::new(self.placement_x, x, duration, Easing::InOutQuad));
    }

    pub fn is_sliding(&self) -> bool {
        self.shift.is_some()
    }

    pub fn advance(&mut self, dt: f32) {
        if let Some(shift) = self.shift.as_mut() {
            self.placement_x = shift.advance(dt);
            if shift.is_finished() {
                self.shift = None;
            }
        }
    }

    /// Consumes the instance. Renderers release their resources when they
    /// observe the page removal.
    pub fn destroy(self) {
        tracing::debug!(content_id = %self.descriptor.content_id, "destroying content instance");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slides_to_target_and_settles() {
        let mut content = ContentInstance::new("kettle");
        content.place(2400.0);
        content.slide_to(1200.0, 0.5);

        content.advance(0.25);
        assert!(content.is_sliding());
        assert!((content.placement_x() - 1800.0).abs() < 1e-3);

        content.advance(0.5);
        assert!(!content.is_sliding());
        assert_eq!(content.placement_x(), 1200.0);
    }
}
