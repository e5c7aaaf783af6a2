//! Command handling shared by every host surface.
//!
//! [`dispatch`] applies one [`CommandPayload`] to a session and reports what
//! the host should emit. When a transient clip is put on screen the reply
//! carries `settle_after`; the host waits that long in its own way and then
//! calls [`settle`] to fetch the steady-state frame.

use std::time::Duration;

use regen_protocol::{CommandPayload, SessionEvent};

use crate::controller::{Frame, SimulationController};
use crate::selection::ActivationOutcome;

#[derive(Debug, Default)]
pub struct Reply {
    pub events: Vec<SessionEvent>,
    /// Frames rendered for this reply, in emission order.
    pub frames: Vec<Frame>,
    /// A new image replaced whatever the canvas showed before.
    pub presented: bool,
    pub settle_after: Option<Duration>,
}

impl Reply {
    fn push_frame(&mut self, frame: Frame, dwell: Option<Duration>) {
        let mut view = frame.view();
        view.dwell_ms = dwell.map(dwell_millis);
        self.events.push(SessionEvent::Frame(view));
        self.frames.push(frame);
    }

    fn push_current(&mut self, controller: &mut SimulationController) {
        match controller.current_frame() {
            Ok(frame) => self.push_frame(frame, None),
            Err(err) => {
                tracing::warn!(
                    target: "regen_sim::assets",
                    asset = %err.asset(),
                    error = %err,
                    "frame.render_failed"
                );
                self.events.push(SessionEvent::Error {
                    message: err.to_string(),
                });
            }
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn dwell_millis(dwell: Duration) -> u64 {
    u64::try_from(dwell.as_millis()).unwrap_or(u64::MAX)
}

pub fn dispatch(controller: &mut SimulationController, payload: CommandPayload) -> Reply {
    let verb = payload.verb();
    let mut reply = Reply::default();
    match payload {
        CommandPayload::Activate {
            category,
            intervention,
        } => match controller.activate(category, &intervention) {
            Ok(activation) => {
                reply.events.push(SessionEvent::Activated {
                    category,
                    intervention: activation.intervention,
                    reconfirmed: activation.outcome == ActivationOutcome::Reconfirmed,
                    animation: activation.animation,
                });
                present_animation(controller, &mut reply);
            }
            Err(err) => reply.events.push(SessionEvent::Rejected {
                category,
                intervention,
                reason: err.to_string(),
            }),
        },
        CommandPayload::Run => {
            let record = controller.run();
            reply.events.push(SessionEvent::Outcome {
                probability: record.probability,
                success: record.success,
            });
            reply.push_current(controller);
            reply.presented = true;
        }
        CommandPayload::Reset => {
            controller.reset();
            reply.events.push(SessionEvent::Reset);
            reply.push_current(controller);
            reply.presented = true;
        }
        CommandPayload::Image => reply.push_current(controller),
        CommandPayload::Drain => reply.events.push(SessionEvent::Drained {
            asset: controller.drain_pending_animation(),
        }),
        CommandPayload::Status => reply.events.push(SessionEvent::Status(controller.status())),
        CommandPayload::Catalog => reply
            .events
            .push(SessionEvent::Catalog(controller.catalog().view())),
    }
    tracing::debug!(
        target: "regen_sim::server",
        command = verb,
        events = reply.events.len(),
        "command.dispatched"
    );
    reply
}

/// Steady-state frame shown once a clip's dwell has elapsed.
pub fn settle(controller: &mut SimulationController) -> Reply {
    let mut reply = Reply::default();
    reply.push_current(controller);
    reply.presented = true;
    reply
}

fn present_animation(controller: &mut SimulationController, reply: &mut Reply) {
    let Some(asset) = controller.drain_pending_animation() else {
        return;
    };
    match controller.animation_frame(&asset) {
        Ok(frame) => {
            let dwell = controller.catalog().dwell();
            reply.push_frame(frame, Some(dwell));
            reply.presented = true;
            reply.settle_after = Some(dwell);
            tracing::debug!(
                target: "regen_sim::animation",
                asset = %asset,
                dwell_ms = dwell_millis(dwell),
                "animation.presented"
            );
        }
        Err(err) => {
            tracing::warn!(
                target: "regen_sim::assets",
                asset = %asset,
                error = %err,
                "animation.load_failed"
            );
            reply.events.push(SessionEvent::Error {
                message: err.to_string(),
            });
            reply.push_current(controller);
            reply.presented = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use image::{Rgba, RgbaImage};
    use regen_protocol::{parse_command_line, AssetId, CategoryKind, FrameSource, InterventionId};

    use crate::assets::InMemoryAssets;
    use crate::catalog::InterventionCatalog;

    fn session() -> SimulationController {
        let catalog = InterventionCatalog::builtin();
        let mut assets = InMemoryAssets::new();
        for asset in catalog.referenced_assets() {
            assets.insert(asset, RgbaImage::from_pixel(4, 4, Rgba([20, 40, 60, 255])));
        }
        SimulationController::with_seed(catalog, Arc::new(assets), 11)
    }

    fn command(line: &str) -> CommandPayload {
        parse_command_line(line).expect("command parses")
    }

    #[test]
    fn activation_shows_the_clip_and_asks_to_settle() {
        let mut controller = session();
        let reply = dispatch(&mut controller, command("activate intrinsic KLF7"));
        assert!(reply.presented);
        assert_eq!(reply.settle_after, Some(Duration::from_millis(1000)));
        match &reply.events[..] {
            [SessionEvent::Activated {
                category,
                reconfirmed,
                animation,
                ..
            }, SessionEvent::Frame(frame)] => {
                assert_eq!(*category, CategoryKind::IntrinsicProgram);
                assert!(!reconfirmed);
                assert_eq!(animation.as_ref(), Some(&AssetId::new("gifs/AAV_gif.png")));
                assert_eq!(frame.source, FrameSource::Animation);
                assert_eq!(frame.dwell_ms, Some(1000));
            }
            other => panic!("unexpected events: {other:?}"),
        }
        assert_eq!(controller.pending_animation(), None);

        let settled = settle(&mut controller);
        match &settled.events[..] {
            [SessionEvent::Frame(frame)] => assert_eq!(frame.source, FrameSource::Steady),
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn rejected_activation_reports_the_lock() {
        let mut controller = session();
        dispatch(&mut controller, command("use support Schwann"));
        let reply = dispatch(&mut controller, command("use support SchwannLike"));
        assert!(!reply.presented);
        assert!(reply.frames.is_empty());
        match &reply.events[..] {
            [SessionEvent::Rejected {
                intervention,
                reason,
                ..
            }] => {
                assert_eq!(intervention, &InterventionId::new("SchwannLike"));
                assert!(reason.contains("Schwann"), "{reason}");
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn run_and_reset_replace_the_canvas() {
        let mut controller = session();
        let reply = dispatch(&mut controller, CommandPayload::Run);
        assert!(reply.presented);
        assert!(matches!(reply.events[0], SessionEvent::Outcome { .. }));
        assert!(matches!(
            &reply.events[1],
            SessionEvent::Frame(frame)
                if matches!(frame.source, FrameSource::Success | FrameSource::Failure)
        ));

        let reply = dispatch(&mut controller, CommandPayload::Reset);
        assert!(matches!(reply.events[0], SessionEvent::Reset));
        assert!(matches!(
            &reply.events[1],
            SessionEvent::Frame(frame) if frame.source == FrameSource::Steady
        ));
    }

    #[test]
    fn missing_clip_falls_back_to_the_steady_frame() {
        let catalog = InterventionCatalog::builtin();
        let mut assets = InMemoryAssets::new();
        for asset in catalog.referenced_assets() {
            assets.insert(asset, RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        }
        assets.remove(&AssetId::new("gifs/AAV_gif.png"));
        let mut controller = SimulationController::with_seed(catalog, Arc::new(assets), 3);

        let reply = dispatch(&mut controller, command("activate intrinsic GAP43"));
        assert_eq!(reply.settle_after, None);
        assert!(matches!(reply.events[1], SessionEvent::Error { .. }));
        assert!(matches!(
            &reply.events[2],
            SessionEvent::Frame(frame) if frame.source == FrameSource::Steady
        ));
    }

    #[test]
    fn queries_do_not_present() {
        let mut controller = session();
        for payload in [
            CommandPayload::Image,
            CommandPayload::Drain,
            CommandPayload::Status,
            CommandPayload::Catalog,
        ] {
            let reply = dispatch(&mut controller, payload);
            assert!(!reply.presented);
            assert_eq!(reply.events.len(), 1);
        }
    }

    #[test]
    fn dwell_millis_saturates() {
        assert_eq!(dwell_millis(Duration::from_millis(1000)), 1000);
        assert_eq!(dwell_millis(Duration::from_micros(1500)), 1);
        assert_eq!(dwell_millis(Duration::MAX), u64::MAX);
    }
}
