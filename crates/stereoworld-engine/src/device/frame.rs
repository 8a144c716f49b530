/// A single acquired surface texture.
///
/// Short-lived: holding it blocks acquisition of the next one. Finish it with
/// [`super::Gpu::present`] or drop it to discard the frame.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}
