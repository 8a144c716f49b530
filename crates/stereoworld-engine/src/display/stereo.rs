use glam::{Mat4, Vec3};

use super::{Compositor, Display, Eye, EyePair, EyeTarget, PoseTracker};
use crate::error::RenderError;
use crate::gpu::{ClearRequest, FramebufferDesc, FramebufferKind, FramebufferTarget, GpuBackend, Viewport};
use crate::pose::PoseProvider;
use crate::shader::ShaderBinding;

/// Per-eye bookkeeping for the current frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
struct EyeProgress {
    draws: u32,
    /// A draw landed in the multisampled target and has not been resolved.
    unresolved: bool,
}

/// Head-mounted display: two multisampled eye targets, resolved and handed
/// to a [`Compositor`] as one pair.
///
/// The pair is only submitted when both eyes received the same number of
/// draws and every draw was resolved. Anything else fails the frame with
/// [`RenderError::IncompleteStereoFrame`] before the compositor sees it.
/// Each prepared frame is submitted at most once.
pub struct StereoDisplay {
    eyes: EyePair<EyeTarget>,
    compositor: Box<dyn Compositor>,
    clear_color: [f32; 4],
    pose: PoseTracker,

    /// world-to-head for the current frame.
    head_inverse: Mat4,
    /// Head position in world space.
    abs_pos: Vec3,
    /// `Some` between `prepare` and `swap`.
    frame: Option<EyePair<EyeProgress>>,
}

impl StereoDisplay {
    /// Allocates both eye framebuffers and reads the fixed per-eye
    /// projections from `pose`.
    ///
    /// An incomplete framebuffer is fatal.
    pub fn new(
        backend: &mut dyn GpuBackend,
        pose: &dyn PoseProvider,
        compositor: Box<dyn Compositor>,
        samples: u32,
        clear_color: [f32; 4],
    ) -> Result<Self, RenderError> {
        let (width, height) = compositor.recommended_size();
        let desc = FramebufferDesc { width, height, samples, kind: FramebufferKind::ColorResolve };

        let mut make_eye = |eye: Eye| -> Result<EyeTarget, RenderError> {
            let fb = backend.create_framebuffer(&desc)?;
            backend.check_framebuffer_complete(fb)?;
            let texture = backend
                .framebuffer_texture(fb)
                .ok_or_else(|| RenderError::resource(format!("{eye:?} eye framebuffer has no resolve texture")))?;
            Ok(EyeTarget {
                target: FramebufferTarget::Offscreen(fb),
                resolve: Some(fb),
                texture: Some(texture),
                viewport: Viewport::sized(width, height),
                projection: pose.eye_perspective(eye),
            })
        };
        let left = make_eye(Eye::Left)?;
        let right = make_eye(Eye::Right)?;

        log::info!("stereo display: {width}x{height} per eye, {samples}x MSAA");

        Ok(Self {
            eyes: EyePair::new(left, right),
            compositor,
            clear_color,
            pose: PoseTracker::new(),
            head_inverse: Mat4::IDENTITY,
            abs_pos: Vec3::ZERO,
            frame: None,
        })
    }

    pub fn eye(&self, eye: Eye) -> &EyeTarget {
        self.eyes.get(eye)
    }

    fn render_eye(
        &mut self,
        backend: &mut dyn GpuBackend,
        shader: &ShaderBinding,
        eye: Eye,
        index_count: u32,
    ) -> Result<(), RenderError> {
        let target = *self.eyes.get(eye);
        let Some(frame) = self.frame.as_mut() else {
            return Err(RenderError::resource("stereo redraw without a prepared frame"));
        };
        backend.bind_framebuffer(target.target);
        backend.set_viewport(target.viewport);
        shader.run(backend, target.projection * self.head_inverse, self.abs_pos);
        backend.draw_indexed(index_count)?;

        let progress = frame.get_mut(eye);
        progress.draws += 1;
        progress.unresolved = true;

        if let Some(fb) = target.resolve {
            backend.resolve_framebuffer(fb)?;
            progress.unresolved = false;
        }
        Ok(())
    }

    fn check_complete(frame: &EyePair<EyeProgress>) -> Result<(), RenderError> {
        let (left, right) = (frame.left, frame.right);
        if left.draws != right.draws || left.unresolved || right.unresolved {
            return Err(RenderError::IncompleteStereoFrame {
                right_draws: right.draws,
                left_draws: left.draws,
                right_resolved: !right.unresolved,
                left_resolved: !left.unresolved,
            });
        }
        Ok(())
    }
}

impl Display for StereoDisplay {
    fn prepare(
        &mut self,
        backend: &mut dyn GpuBackend,
        pose: &mut dyn PoseProvider,
        _shader: &ShaderBinding,
    ) -> Result<(), RenderError> {
        let head = self.pose.acquire(pose);
        self.abs_pos = head.w_axis.truncate();
        self.head_inverse = head.inverse();
        self.frame = Some(EyePair::default());

        for eye in [Eye::Left, Eye::Right] {
            let target = self.eyes.get(eye);
            backend.bind_framebuffer(target.target);
            backend.set_viewport(target.viewport);
            backend.clear(ClearRequest::color_and_depth(self.clear_color));
        }
        Ok(())
    }

    fn redraw(
        &mut self,
        backend: &mut dyn GpuBackend,
        shader: &ShaderBinding,
        index_count: u32,
    ) -> Result<(), RenderError> {
        for eye in Eye::ORDER {
            self.render_eye(backend, shader, eye, index_count)?;
        }
        Ok(())
    }

    fn swap(&mut self, backend: &mut dyn GpuBackend) -> Result<(), RenderError> {
        let Some(frame) = self.frame.take() else {
            return Err(RenderError::resource("stereo swap without a prepared frame"));
        };
        Self::check_complete(&frame)?;

        // Nothing was drawn: resolve the cleared targets so the pair is this frame's.
        if frame.left.draws == 0 {
            for eye in Eye::ORDER {
                if let Some(fb) = self.eyes.get(eye).resolve {
                    backend.resolve_framebuffer(fb)?;
                }
            }
        }

        let (Some(left), Some(right)) = (self.eyes.left.texture, self.eyes.right.texture) else {
            return Err(RenderError::resource("stereo eye without a resolve texture"));
        };
        self.compositor.submit(backend, EyePair::new(left, right))?;
        backend.present()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::gpu::{GpuOp, RecordingBackend, TextureHandle, Uniform, UniformValue};
    use crate::testing::{ScriptedPose, bound_quad};

    /// Compositor that only records what it was handed.
    struct Capture {
        submitted: Rc<RefCell<Vec<EyePair<TextureHandle>>>>,
    }

    impl Compositor for Capture {
        fn recommended_size(&self) -> (u32, u32) {
            (64, 32)
        }

        fn submit(&mut self, _: &mut dyn GpuBackend, eyes: EyePair<TextureHandle>) -> Result<(), RenderError> {
            self.submitted.borrow_mut().push(eyes);
            Ok(())
        }
    }

    struct Fixture {
        backend: RecordingBackend,
        shader: ShaderBinding,
        display: StereoDisplay,
        pose: ScriptedPose,
        submitted: Rc<RefCell<Vec<EyePair<TextureHandle>>>>,
    }

    fn fixture() -> Fixture {
        let mut backend = RecordingBackend::new(500, 500);
        let shader = ShaderBinding::new(&mut backend).unwrap();
        let pose = ScriptedPose::fixed(Mat4::from_translation(Vec3::new(0.0, 1.5, 0.0)));
        let submitted = Rc::new(RefCell::new(Vec::new()));
        let compositor = Box::new(Capture { submitted: submitted.clone() });
        let display = StereoDisplay::new(&mut backend, &pose, compositor, 4, [0.0; 4]).unwrap();
        Fixture { backend, shader, display, pose, submitted }
    }

    // ── creation ──────────────────────────────────────────────────────────

    #[test]
    fn creates_two_checked_multisampled_targets() {
        let f = fixture();
        let created = f.backend.count(|op| {
            matches!(op, GpuOp::CreateFramebuffer(d) if d.samples == 4 && d.kind == FramebufferKind::ColorResolve && (d.width, d.height) == (64, 32))
        });
        assert_eq!(created, 2);
        assert_eq!(f.backend.count(|op| matches!(op, GpuOp::CheckFramebuffer(_))), 2);
        assert_ne!(f.display.eye(Eye::Left).target, f.display.eye(Eye::Right).target);
    }

    #[test]
    fn incomplete_framebuffer_is_fatal() {
        let mut backend = RecordingBackend::new(500, 500);
        backend.fail_framebuffer_completeness();
        let pose = ScriptedPose::fixed(Mat4::IDENTITY);
        let compositor = Box::new(Capture { submitted: Rc::default() });
        let result = StereoDisplay::new(&mut backend, &pose, compositor, 4, [0.0; 4]);
        assert!(matches!(result, Err(RenderError::Resource { .. })));
    }

    // ── frame ─────────────────────────────────────────────────────────────

    #[test]
    fn each_material_is_drawn_and_resolved_right_eye_first() {
        let mut f = fixture();
        f.display.prepare(&mut f.backend, &mut f.pose, &f.shader).unwrap();
        bound_quad(&mut f.backend);
        f.display.redraw(&mut f.backend, &f.shader, 6).unwrap();

        let right = f.display.eye(Eye::Right).target;
        let left = f.display.eye(Eye::Left).target;
        assert_eq!(f.backend.draws(), vec![(right, 6), (left, 6)]);

        let FramebufferTarget::Offscreen(right_fb) = right else { panic!("offscreen eye") };
        let draw = f.backend.position(|op| matches!(op, GpuOp::DrawIndexed { target, .. } if *target == right));
        let resolve = f.backend.position(|op| *op == GpuOp::Resolve(right_fb));
        assert!(draw.unwrap() < resolve.unwrap());
    }

    #[test]
    fn eyes_use_the_inverted_head_transform() {
        let mut f = fixture();
        f.display.prepare(&mut f.backend, &mut f.pose, &f.shader).unwrap();
        bound_quad(&mut f.backend);
        f.display.redraw(&mut f.backend, &f.shader, 6).unwrap();

        let head = Mat4::from_translation(Vec3::new(0.0, 1.5, 0.0));
        let expected = f.pose.eye_perspective(Eye::Right) * head.inverse();
        assert!(f.backend.ops().contains(&GpuOp::SetUniform(Uniform::Mvp, UniformValue::Mat4(expected))));
        assert!(f.backend.ops().contains(&GpuOp::SetUniform(
            Uniform::EyePosition,
            UniformValue::Vec3(Vec3::new(0.0, 1.5, 0.0))
        )));
    }

    #[test]
    fn complete_frame_submits_both_resolve_textures() {
        let mut f = fixture();
        f.display.prepare(&mut f.backend, &mut f.pose, &f.shader).unwrap();
        bound_quad(&mut f.backend);
        f.display.redraw(&mut f.backend, &f.shader, 6).unwrap();
        f.display.redraw(&mut f.backend, &f.shader, 6).unwrap();
        f.display.swap(&mut f.backend).unwrap();

        let submitted = f.submitted.borrow();
        assert_eq!(submitted.len(), 1);
        assert_eq!(Some(submitted[0].left), f.display.eye(Eye::Left).texture);
        assert_eq!(Some(submitted[0].right), f.display.eye(Eye::Right).texture);
        assert_eq!(f.backend.ops().last(), Some(&GpuOp::Present));
    }

    // ── atomicity ─────────────────────────────────────────────────────────

    #[test]
    fn failed_left_eye_blocks_submission() {
        let mut f = fixture();
        let left = f.display.eye(Eye::Left).target;
        f.display.prepare(&mut f.backend, &mut f.pose, &f.shader).unwrap();
        bound_quad(&mut f.backend);
        f.backend.fail_draws_on(left);

        assert!(f.display.redraw(&mut f.backend, &f.shader, 6).is_err());
        let err = f.display.swap(&mut f.backend).unwrap_err();

        assert!(matches!(
            err,
            RenderError::IncompleteStereoFrame { right_draws: 1, left_draws: 0, right_resolved: true, .. }
        ));
        assert!(f.submitted.borrow().is_empty());
        assert_eq!(f.backend.count(|op| *op == GpuOp::Present), 0);
    }

    #[test]
    fn prepare_starts_a_fresh_frame() {
        let mut f = fixture();
        let left = f.display.eye(Eye::Left).target;
        f.display.prepare(&mut f.backend, &mut f.pose, &f.shader).unwrap();
        bound_quad(&mut f.backend);
        f.backend.fail_draws_on(left);
        let _ = f.display.redraw(&mut f.backend, &f.shader, 6);

        f.display.prepare(&mut f.backend, &mut f.pose, &f.shader).unwrap();
        f.backend.clear_ops();
        f.display.swap(&mut f.backend).unwrap();
        assert_eq!(f.submitted.borrow().len(), 1);
    }

    #[test]
    fn empty_frame_resolves_the_cleared_targets_before_submitting() {
        let mut f = fixture();
        f.display.prepare(&mut f.backend, &mut f.pose, &f.shader).unwrap();
        f.backend.clear_ops();
        f.display.swap(&mut f.backend).unwrap();

        let resolve_fb = |eye| f.display.eye(eye).resolve.unwrap();
        let present = f.backend.position(|op| *op == GpuOp::Present).unwrap();
        for eye in [Eye::Left, Eye::Right] {
            let fb = resolve_fb(eye);
            let resolved = f.backend.position(|op| *op == GpuOp::Resolve(fb));
            assert!(resolved.unwrap() < present, "{eye:?} eye not resolved");
        }
        assert_eq!(f.backend.count(|op| matches!(op, GpuOp::DrawIndexed { .. })), 0);
        assert_eq!(f.submitted.borrow().len(), 1);
    }

    #[test]
    fn a_frame_is_submitted_once() {
        let mut f = fixture();
        f.display.prepare(&mut f.backend, &mut f.pose, &f.shader).unwrap();
        bound_quad(&mut f.backend);
        f.display.redraw(&mut f.backend, &f.shader, 6).unwrap();
        f.display.swap(&mut f.backend).unwrap();

        let err = f.display.swap(&mut f.backend).unwrap_err();
        assert!(matches!(err, RenderError::Resource { .. }));
        assert_eq!(f.submitted.borrow().len(), 1);
        assert_eq!(f.backend.count(|op| *op == GpuOp::Present), 1);
    }

    #[test]
    fn swap_without_prepare_is_rejected() {
        let mut f = fixture();
        assert!(f.display.swap(&mut f.backend).is_err());
        assert!(f.submitted.borrow().is_empty());
        assert_eq!(f.backend.count(|op| *op == GpuOp::Present), 0);
    }

    #[test]
    fn redraw_without_prepare_draws_nothing() {
        let mut f = fixture();
        bound_quad(&mut f.backend);
        assert!(f.display.redraw(&mut f.backend, &f.shader, 6).is_err());
        assert!(f.backend.draws().is_empty());
    }

    #[test]
    fn missing_pose_keeps_the_previous_head() {
        let mut f = fixture();
        let mut pose = ScriptedPose::fixed(Mat4::from_translation(Vec3::Z)).failing_after(1);
        f.display.prepare(&mut f.backend, &mut pose, &f.shader).unwrap();
        f.display.prepare(&mut f.backend, &mut pose, &f.shader).unwrap();
        assert_eq!(f.display.abs_pos, Vec3::Z);
        assert_eq!(f.display.pose.failures(), 1);
    }
}
