//! Raw call catalog.
//!
//! One typed wrapper per remote command. Arguments are encoded in order
//! after the command name; nothing is validated here. Fire-and-forget
//! commands return immediately, awaited ones decode the return value.

use crate::codec::{Aabb, LineSegment, Mat4, Rgb, Rgba, Rgba32, Vec2, Vec3, WireBuffer};
use crate::error::Result;
use crate::protocol::Request;
use crate::transport::Transport;

use super::version::Version;

/// Typed access to every remote command.
#[derive(Debug, Clone)]
pub struct Commands {
    transport: Transport,
}

impl Commands {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    #[inline]
    fn fire(&self, request: Request) {
        self.transport.send_fire_and_forget(request);
    }

    #[inline]
    async fn call(&self, request: Request) -> Result<WireBuffer> {
        self.transport.send_awaited(request).await
    }

    // ---- session ----

    pub async fn get_version(&self) -> Result<Version> {
        self.call(Request::new("getVersion")).await?.read()
    }

    /// Ask the remote to start rendering; `false` if it cannot.
    pub async fn start_stream(&self, width: u32, height: u32, fps: u32) -> Result<bool> {
        let request = Request::new("startStream")
            .arg(&width)
            .arg(&height)
            .arg(&fps);
        self.call(request).await?.read()
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.fire(Request::new("resize").arg(&width).arg(&height));
    }

    // ---- camera ----

    pub fn set_camera(&self, position: Vec3, target: Vec3) {
        self.fire(Request::new("setCamera").arg(&position).arg(&target));
    }

    pub fn set_camera_fov(&self, degrees: f32) {
        self.fire(Request::new("setCameraFov").arg(&degrees));
    }

    pub fn set_camera_speed(&self, speed: f32) {
        self.fire(Request::new("setCameraSpeed").arg(&speed));
    }

    pub fn zoom_to(&self, ids: &[u32], blend_time: f32) {
        self.fire(Request::new("zoomTo").arg(ids).arg(&blend_time));
    }

    // ---- scene ----

    pub fn set_background_color(&self, color: Rgb) {
        self.fire(Request::new("setBackgroundColor").arg(&color));
    }

    pub fn set_visibility(&self, ids: &[u32], visible: bool) {
        self.fire(Request::new("setVisibility").arg(ids).arg(&visible));
    }

    pub fn set_opacity(&self, ids: &[u32], opacity: f32) {
        self.fire(Request::new("setOpacity").arg(ids).arg(&opacity));
    }

    pub fn set_colors(&self, ids: &[u32], colors: &[Rgba32]) {
        self.fire(Request::new("setColors").arg(ids).arg(colors));
    }

    pub fn reset_colors(&self, ids: &[u32]) {
        self.fire(Request::new("resetColors").arg(ids));
    }

    /// Returns the id of the first created material; the rest follow it.
    pub async fn create_materials(&self, colors: &[Rgba]) -> Result<u32> {
        self.call(Request::new("createMaterials").arg(colors))
            .await?
            .read()
    }

    pub fn set_materials(&self, ids: &[u32], materials: &[u32]) {
        self.fire(Request::new("setMaterials").arg(ids).arg(materials));
    }

    pub fn set_transform(&self, id: u32, matrix: &Mat4) {
        self.fire(Request::new("setTransform").arg(&id).arg(matrix));
    }

    pub async fn get_bounding_box(&self, ids: &[u32]) -> Result<Aabb> {
        self.call(Request::new("getBoundingBox").arg(ids))
            .await?
            .read()
    }

    /// Node under a screen point, `-1` for none.
    pub async fn pick(&self, screen: Vec2) -> Result<i32> {
        self.call(Request::new("pick").arg(&screen)).await?.read()
    }

    // ---- annotations ----

    pub async fn add_text(&self, text: &str, position: Vec3, color: Rgba) -> Result<u32> {
        let request = Request::new("addText")
            .arg(text)
            .arg(&position)
            .arg(&color);
        self.call(request).await?.read()
    }

    pub fn remove_text(&self, id: u32) {
        self.fire(Request::new("removeText").arg(&id));
    }

    /// Returns the id of the first created line.
    pub async fn add_lines(&self, segments: &[LineSegment], color: Rgba) -> Result<u32> {
        let request = Request::new("addLines").arg(segments).arg(&color);
        self.call(request).await?.read()
    }

    // ---- input ----

    pub fn pointer_down(&self, screen: Vec2, button: u8) {
        self.fire(Request::new("pointerDown").arg(&screen).arg(&button));
    }

    pub fn pointer_up(&self, screen: Vec2, button: u8) {
        self.fire(Request::new("pointerUp").arg(&screen).arg(&button));
    }

    pub fn pointer_move(&self, screen: Vec2, button: u8) {
        self.fire(Request::new("pointerMove").arg(&screen).arg(&button));
    }

    pub fn wheel(&self, delta: f32) {
        self.fire(Request::new("wheel").arg(&delta));
    }

    pub fn key_down(&self, key: &str) {
        self.fire(Request::new("keyDown").arg(key));
    }

    pub fn key_up(&self, key: &str) {
        self.fire(Request::new("keyUp").arg(key));
    }

    // ---- models ----

    pub async fn load_model(&self, url: &str) -> Result<u32> {
        self.call(Request::new("loadModel").arg(url)).await?.read()
    }

    /// Raw status tag and progress fraction of a load.
    pub async fn get_load_status(&self, handle: u32) -> Result<(i32, f32)> {
        let mut reply = self
            .call(Request::new("getLoadStatus").arg(&handle))
            .await?;
        let status = reply.read()?;
        let progress = reply.read()?;
        Ok((status, progress))
    }

    pub fn unload_model(&self, handle: u32) {
        self.fire(Request::new("unloadModel").arg(&handle));
    }

    pub async fn get_last_error(&self) -> Result<String> {
        self.call(Request::new("getLastError")).await?.read()
    }
}
