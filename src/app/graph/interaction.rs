use eframe::egui::{PointerButton, Pos2, Rect, Vec2};

use crate::app::physics::LayoutCommand;

const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 4.0;
const CLICK_SLOP: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Camera {
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub(in crate::app) fn world_to_screen(self, rect: Rect, world: Vec2) -> Pos2 {
        rect.center() + self.pan + world * self.zoom
    }

    pub(in crate::app) fn screen_to_world(self, rect: Rect, screen: Pos2) -> Vec2 {
        (screen - rect.center() - self.pan) / self.zoom
    }

    pub(in crate::app) fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    pub(in crate::app) fn zoom_at(&mut self, rect: Rect, anchor: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        let world_before = self.screen_to_world(rect, anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = anchor - rect.center() - (world_before * self.zoom);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum PointerEvent {
    Pressed { pos: Pos2, button: PointerButton },
    Moved { pos: Pos2 },
    Released { pos: Pos2 },
    Scrolled { pos: Pos2, delta: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum ShellEvent {
    NodeClicked(usize),
    BackgroundClicked,
}

#[derive(Debug, Default, PartialEq)]
pub(in crate::app) struct Interaction {
    pub commands: Vec<LayoutCommand>,
    pub shell_event: Option<ShellEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Gesture {
    #[default]
    Idle,
    DraggingNode {
        node: usize,
        origin: Pos2,
        moved: bool,
    },
    Panning {
        origin: Pos2,
        last: Pos2,
        moved: bool,
        primary: bool,
    },
}

#[derive(Debug, Default)]
pub(in crate::app) struct InteractionController {
    camera: Camera,
    gesture: Gesture,
}

impl InteractionController {
    pub(in crate::app) fn camera(&self) -> Camera {
        self.camera
    }

    pub(in crate::app) fn dragged_node(&self) -> Option<usize> {
        match self.gesture {
            Gesture::DraggingNode { node, .. } => Some(node),
            _ => None,
        }
    }

    pub(in crate::app) fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// Drops any gesture in flight. Node indices do not survive a graph
    /// rebuild, so the canvas calls this whenever it re-seeds the layout.
    pub(in crate::app) fn reset_gesture(&mut self) {
        self.gesture = Gesture::Idle;
    }

    pub(in crate::app) fn handle(
        &mut self,
        rect: Rect,
        event: PointerEvent,
        hit: Option<usize>,
    ) -> Interaction {
        let mut interaction = Interaction::default();

        match (event, self.gesture) {
            (PointerEvent::Scrolled { pos, delta }, _) => {
                let factor = (1.0 + (delta * 0.0018)).clamp(0.85, 1.15);
                self.camera.zoom_at(rect, pos, factor);
            }
            (PointerEvent::Pressed { pos, button }, Gesture::Idle) => match (button, hit) {
                (PointerButton::Primary, Some(node)) => {
                    self.gesture = Gesture::DraggingNode {
                        node,
                        origin: pos,
                        moved: false,
                    };
                    interaction.commands.push(LayoutCommand::PinStart { node });
                }
                (PointerButton::Primary | PointerButton::Secondary | PointerButton::Middle, _) => {
                    self.gesture = Gesture::Panning {
                        origin: pos,
                        last: pos,
                        moved: false,
                        primary: button == PointerButton::Primary,
                    };
                }
                _ => {}
            },
            (PointerEvent::Pressed { .. }, _) => {}
            (PointerEvent::Moved { pos }, Gesture::DraggingNode { node, origin, moved }) => {
                let moved = moved || pos.distance(origin) > CLICK_SLOP;
                self.gesture = Gesture::DraggingNode {
                    node,
                    origin,
                    moved,
                };
                if moved {
                    interaction.commands.push(LayoutCommand::PinMove {
                        node,
                        to: self.camera.screen_to_world(rect, pos),
                    });
                }
            }
            (
                PointerEvent::Moved { pos },
                Gesture::Panning {
                    origin,
                    last,
                    moved,
                    primary,
                },
            ) => {
                self.camera.pan_by(pos - last);
                self.gesture = Gesture::Panning {
                    origin,
                    last: pos,
                    moved: moved || pos.distance(origin) > CLICK_SLOP,
                    primary,
                };
            }
            (PointerEvent::Moved { .. }, Gesture::Idle) => {}
            (PointerEvent::Released { .. }, Gesture::DraggingNode { node, moved, .. }) => {
                interaction.commands.push(LayoutCommand::PinEnd { node });
                if !moved {
                    interaction.shell_event = Some(ShellEvent::NodeClicked(node));
                }
                self.gesture = Gesture::Idle;
            }
            (
                PointerEvent::Released { pos },
                Gesture::Panning {
                    last,
                    moved,
                    primary,
                    ..
                },
            ) => {
                self.camera.pan_by(pos - last);
                if primary && !moved {
                    interaction.shell_event = Some(ShellEvent::BackgroundClicked);
                }
                self.gesture = Gesture::Idle;
            }
            (PointerEvent::Released { .. }, Gesture::Idle) => {}
        }

        interaction
    }
}

pub(in crate::app) fn hit_test(positions: &[Pos2], radii: &[f32], pointer: Pos2) -> Option<usize> {
    positions
        .iter()
        .zip(radii)
        .enumerate()
        .filter_map(|(index, (position, radius))| {
            let distance = position.distance(pointer);
            (distance <= *radius).then_some((index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    fn viewport() -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0))
    }

    fn press(x: f32, y: f32) -> PointerEvent {
        PointerEvent::Pressed {
            pos: pos2(x, y),
            button: PointerButton::Primary,
        }
    }

    #[test]
    fn zoom_is_clamped() {
        let mut controller = InteractionController::default();
        for _ in 0..200 {
            controller.handle(
                viewport(),
                PointerEvent::Scrolled {
                    pos: pos2(400.0, 300.0),
                    delta: 500.0,
                },
                None,
            );
        }
        assert_eq!(controller.camera().zoom, MAX_ZOOM);

        for _ in 0..400 {
            controller.handle(
                viewport(),
                PointerEvent::Scrolled {
                    pos: pos2(400.0, 300.0),
                    delta: -500.0,
                },
                None,
            );
        }
        assert_eq!(controller.camera().zoom, MIN_ZOOM);
    }

    #[test]
    fn zoom_keeps_point_under_pointer() {
        let rect = viewport();
        let mut camera = Camera {
            pan: vec2(35.0, -20.0),
            zoom: 1.3,
        };
        let anchor = pos2(612.0, 141.0);
        let world = camera.screen_to_world(rect, anchor);

        camera.zoom_at(rect, anchor, 1.15);
        let after = camera.world_to_screen(rect, world);
        assert!((after - anchor).length() < 1e-3);
    }

    #[test]
    fn click_on_node_pins_and_reports() {
        let mut controller = InteractionController::default();
        let rect = viewport();

        let pressed = controller.handle(rect, press(100.0, 100.0), Some(2));
        assert_eq!(pressed.commands, vec![LayoutCommand::PinStart { node: 2 }]);
        assert_eq!(controller.dragged_node(), Some(2));

        let jitter = controller.handle(rect, PointerEvent::Moved { pos: pos2(102.0, 101.0) }, None);
        assert!(jitter.commands.is_empty());

        let released =
            controller.handle(rect, PointerEvent::Released { pos: pos2(102.0, 101.0) }, None);
        assert_eq!(released.commands, vec![LayoutCommand::PinEnd { node: 2 }]);
        assert_eq!(released.shell_event, Some(ShellEvent::NodeClicked(2)));
        assert!(!controller.is_active());
    }

    #[test]
    fn dragging_node_moves_pin_in_world_space() {
        let mut controller = InteractionController::default();
        let rect = viewport();
        controller.handle(
            rect,
            PointerEvent::Scrolled {
                pos: rect.center(),
                delta: 100.0,
            },
            None,
        );
        let camera = controller.camera();

        controller.handle(rect, press(400.0, 300.0), Some(0));
        let moved = controller.handle(rect, PointerEvent::Moved { pos: pos2(460.0, 280.0) }, None);
        assert_eq!(
            moved.commands,
            vec![LayoutCommand::PinMove {
                node: 0,
                to: camera.screen_to_world(rect, pos2(460.0, 280.0)),
            }]
        );

        let released =
            controller.handle(rect, PointerEvent::Released { pos: pos2(460.0, 280.0) }, None);
        assert_eq!(released.commands, vec![LayoutCommand::PinEnd { node: 0 }]);
        assert_eq!(released.shell_event, None);
        assert_eq!(controller.camera(), camera);
    }

    #[test]
    fn background_click_and_pan_are_told_apart() {
        let mut controller = InteractionController::default();
        let rect = viewport();

        controller.handle(rect, press(50.0, 50.0), None);
        let click = controller.handle(rect, PointerEvent::Released { pos: pos2(51.0, 50.0) }, None);
        assert_eq!(click.shell_event, Some(ShellEvent::BackgroundClicked));
        assert!(click.commands.is_empty());

        controller.handle(rect, press(50.0, 50.0), None);
        controller.handle(rect, PointerEvent::Moved { pos: pos2(80.0, 90.0) }, None);
        let pan = controller.handle(rect, PointerEvent::Released { pos: pos2(90.0, 90.0) }, None);
        assert_eq!(pan.shell_event, None);
        assert_eq!(controller.camera().pan, vec2(40.0, 40.0));
    }

    #[test]
    fn secondary_drag_pans_over_nodes_without_clicking() {
        let mut controller = InteractionController::default();
        let rect = viewport();

        let pressed = controller.handle(
            rect,
            PointerEvent::Pressed {
                pos: pos2(10.0, 10.0),
                button: PointerButton::Secondary,
            },
            Some(4),
        );
        assert!(pressed.commands.is_empty());
        let released =
            controller.handle(rect, PointerEvent::Released { pos: pos2(10.0, 10.0) }, Some(4));
        assert_eq!(released.shell_event, None);
    }

    #[test]
    fn reset_drops_gesture_in_flight() {
        let mut controller = InteractionController::default();
        let rect = viewport();
        controller.handle(rect, press(10.0, 10.0), Some(1));
        controller.reset_gesture();

        let released =
            controller.handle(rect, PointerEvent::Released { pos: pos2(10.0, 10.0) }, None);
        assert_eq!(released, Interaction::default());
    }

    #[test]
    fn hit_test_prefers_nearest_centre() {
        let positions = [pos2(0.0, 0.0), pos2(10.0, 0.0), pos2(100.0, 100.0)];
        let radii = [8.0, 8.0, 8.0];

        assert_eq!(hit_test(&positions, &radii, pos2(6.0, 0.0)), Some(1));
        assert_eq!(hit_test(&positions, &radii, pos2(-3.0, 1.0)), Some(0));
        assert_eq!(hit_test(&positions, &radii, pos2(50.0, 50.0)), None);
    }
}
