//! API module - the validated, batched façade over the call catalog.
//!
//! Every [`Api`] operation checks its arguments first. A failed check is
//! logged and the operation returns its default ([`INVALID_HANDLE`],
//! `None`, [`Aabb::EMPTY`] or an empty `Vec`) without sending anything.
//! Opacity, blend time and camera speed are clamped instead of refused.
//!
//! Bulk arguments are split into batches of at most
//! [`BatchConfig::max_batch_size`] elements, one call per batch. Awaited
//! batches run together and fail together: if any batch call fails the
//! failure is logged and the default returned.
//!
//! Use [`Commands`] directly to skip validation.

mod batch;
mod commands;
mod materials;
pub mod validate;
mod version;

pub use batch::{batches, expand_ids, paired_batches, union_boxes, Batch};
pub use commands::Commands;
pub use materials::{MaterialCatalog, BUILTIN_MATERIALS};
pub use version::{StreamSettings, Version, VersionGate, CLIENT_VERSION};

use std::sync::Arc;

use futures_util::future::try_join_all;

use crate::codec::{Aabb, LineSegment, Mat4, Rgb, Rgba, Rgba32, Vec2, Vec3};
use crate::config::{BatchConfig, LoadConfig};
use crate::error::Error;
use crate::load::{LoadError, LoadErrorKind, LoadSession};
use crate::transport::Transport;
use validate::{Invalid, BLEND_TIME_RANGE, OPACITY_RANGE, SPEED_RANGE};

/// Handle value meaning "no resource".
pub const INVALID_HANDLE: u32 = u32::MAX;

/// Return `$default` from the enclosing function if any check fails.
macro_rules! ensure {
    ($op:expr, $default:expr; $($check:expr),+ $(,)?) => {
        $(
            if let Err(reason) = $check {
                return rejected($op, reason, $default);
            }
        )+
    };
}

fn rejected<T>(op: &str, reason: Invalid, default: T) -> T {
    tracing::warn!("{} ignored: {}", op, reason);
    default
}

fn failed<T>(op: &str, error: Error, default: T) -> T {
    tracing::error!("{} failed: {}", op, error);
    default
}

/// Validated access to the remote renderer.
#[derive(Debug, Clone)]
pub struct Api {
    commands: Commands,
    catalog: Arc<MaterialCatalog>,
    batch: BatchConfig,
    load: LoadConfig,
}

impl Api {
    pub fn new(transport: Transport, catalog: Arc<MaterialCatalog>) -> Self {
        Self {
            commands: Commands::new(transport),
            catalog,
            batch: BatchConfig::default(),
            load: LoadConfig::default(),
        }
    }

    pub fn with_batch_config(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_load_config(mut self, load: LoadConfig) -> Self {
        self.load = load;
        self
    }

    /// The unvalidated call catalog.
    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    #[inline]
    fn batch_size(&self) -> usize {
        self.batch.max_batch_size
    }

    // ---- camera ----

    pub fn resize(&self, width: u32, height: u32) {
        ensure!("resize", (); validate::viewport(width, height));
        self.commands.resize(width, height);
    }

    pub fn set_camera(&self, position: Vec3, target: Vec3) {
        ensure!("setCamera", ();
            validate::finite_vec3("position", position),
            validate::finite_vec3("target", target),
        );
        self.commands.set_camera(position, target);
    }

    /// Vertical field of view in degrees, strictly between 0 and 180.
    pub fn set_camera_fov(&self, degrees: f32) {
        ensure!("setCameraFov", (); validate::field_of_view(degrees));
        self.commands.set_camera_fov(degrees);
    }

    pub fn set_camera_speed(&self, speed: f32) {
        self.commands
            .set_camera_speed(validate::clamp(speed, &SPEED_RANGE));
    }

    /// Frame the given nodes, blending over `blend_time` seconds.
    ///
    /// A zoom is a single camera move, so the ids go out in one call.
    pub fn zoom_to(&self, ids: &[u32], blend_time: f32) {
        ensure!("zoomTo", (); validate::non_empty("ids", ids));
        self.commands
            .zoom_to(ids, validate::clamp(blend_time, &BLEND_TIME_RANGE));
    }

    // ---- scene ----

    pub fn set_background_color(&self, color: Rgb) {
        ensure!("setBackgroundColor", (); validate::rgb("color", color));
        self.commands.set_background_color(color);
    }

    pub fn set_visibility(&self, ids: &[u32], visible: bool) {
        ensure!("setVisibility", (); validate::non_empty("ids", ids));
        for batch in batches(ids, self.batch_size()) {
            self.commands.set_visibility(batch.items, visible);
        }
    }

    pub fn set_opacity(&self, ids: &[u32], opacity: f32) {
        ensure!("setOpacity", (); validate::non_empty("ids", ids));
        let opacity = validate::clamp(opacity, &OPACITY_RANGE);
        for batch in batches(ids, self.batch_size()) {
            self.commands.set_opacity(batch.items, opacity);
        }
    }

    /// Per-node colors; `colors[i]` applies to `ids[i]`.
    pub fn set_colors(&self, ids: &[u32], colors: &[Rgba32]) {
        ensure!("setColors", ();
            validate::non_empty("ids", ids),
            validate::same_length(("ids", ids), ("colors", colors)),
        );
        for (ids, colors) in paired_batches(ids, colors, self.batch_size()) {
            self.commands.set_colors(ids.items, colors.items);
        }
    }

    pub fn reset_colors(&self, ids: &[u32]) {
        ensure!("resetColors", (); validate::non_empty("ids", ids));
        for batch in batches(ids, self.batch_size()) {
            self.commands.reset_colors(batch.items);
        }
    }

    /// Create one material per color and return their handles in order.
    ///
    /// The new handles are added to the material catalog.
    pub async fn create_materials(&self, colors: &[Rgba]) -> Vec<u32> {
        ensure!("createMaterials", Vec::new(); validate::non_empty("colors", colors));
        if let Some(bad) = colors.iter().find_map(|c| validate::rgba("color", *c).err()) {
            return rejected("createMaterials", bad, Vec::new());
        }

        let parts: Vec<Batch<'_, Rgba>> = batches(colors, self.batch_size()).collect();
        let calls = parts
            .iter()
            .map(|batch| self.commands.create_materials(batch.items));
        let bases = match try_join_all(calls).await {
            Ok(bases) => bases,
            Err(e) => return failed("createMaterials", e, Vec::new()),
        };

        let handles = expand_ids(parts.iter().map(Batch::len).zip(bases));
        self.catalog.register(handles.iter().copied());
        handles
    }

    /// Per-node materials; `materials[i]` applies to `ids[i]`.
    pub fn set_materials(&self, ids: &[u32], materials: &[u32]) {
        ensure!("setMaterials", ();
            validate::non_empty("ids", ids),
            validate::same_length(("ids", ids), ("materials", materials)),
            validate::known_materials(&self.catalog, materials),
        );
        for (ids, materials) in paired_batches(ids, materials, self.batch_size()) {
            self.commands.set_materials(ids.items, materials.items);
        }
    }

    pub fn set_transform(&self, id: u32, matrix: &Mat4) {
        ensure!("setTransform", (); validate::finite_matrix(matrix));
        self.commands.set_transform(id, matrix);
    }

    /// World-space box around the given nodes, [`Aabb::EMPTY`] on failure.
    pub async fn get_bounding_box(&self, ids: &[u32]) -> Aabb {
        ensure!("getBoundingBox", Aabb::EMPTY; validate::non_empty("ids", ids));

        let calls =
            batches(ids, self.batch_size()).map(|batch| self.commands.get_bounding_box(batch.items));
        match try_join_all(calls).await {
            Ok(boxes) => union_boxes(boxes),
            Err(e) => failed("getBoundingBox", e, Aabb::EMPTY),
        }
    }

    /// Node under a normalized screen point.
    pub async fn pick(&self, screen: Vec2) -> Option<u32> {
        ensure!("pick", None; validate::screen(screen));
        match self.commands.pick(screen).await {
            Ok(id) => u32::try_from(id).ok(),
            Err(e) => failed("pick", e, None),
        }
    }

    // ---- annotations ----

    pub async fn add_text(&self, text: &str, position: Vec3, color: Rgba) -> u32 {
        ensure!("addText", INVALID_HANDLE;
            validate::non_empty_text("text", text),
            validate::finite_vec3("position", position),
            validate::rgba("color", color),
        );
        match self.commands.add_text(text, position, color).await {
            Ok(id) => id,
            Err(e) => failed("addText", e, INVALID_HANDLE),
        }
    }

    pub fn remove_text(&self, id: u32) {
        if id == INVALID_HANDLE {
            return rejected("removeText", Invalid("invalid text handle".into()), ());
        }
        self.commands.remove_text(id);
    }

    /// Add line segments and return their ids in order.
    pub async fn add_lines(&self, segments: &[LineSegment], color: Rgba) -> Vec<u32> {
        ensure!("addLines", Vec::new();
            validate::non_empty("segments", segments),
            validate::finite_segments(segments),
            validate::rgba("color", color),
        );

        let parts: Vec<Batch<'_, LineSegment>> = batches(segments, self.batch_size()).collect();
        let calls = parts
            .iter()
            .map(|batch| self.commands.add_lines(batch.items, color));
        match try_join_all(calls).await {
            Ok(bases) => expand_ids(parts.iter().map(Batch::len).zip(bases)),
            Err(e) => failed("addLines", e, Vec::new()),
        }
    }

    // ---- input ----

    pub fn pointer_down(&self, screen: Vec2, button: u8) {
        ensure!("pointerDown", ();
            validate::screen(screen),
            validate::pointer_button(button),
        );
        self.commands.pointer_down(screen, button);
    }

    pub fn pointer_up(&self, screen: Vec2, button: u8) {
        ensure!("pointerUp", ();
            validate::screen(screen),
            validate::pointer_button(button),
        );
        self.commands.pointer_up(screen, button);
    }

    pub fn pointer_move(&self, screen: Vec2, button: u8) {
        ensure!("pointerMove", ();
            validate::screen(screen),
            validate::pointer_button(button),
        );
        self.commands.pointer_move(screen, button);
    }

    pub fn wheel(&self, delta: f32) {
        ensure!("wheel", (); validate::finite("delta", delta));
        self.commands.wheel(delta);
    }

    pub fn key_down(&self, key: &str) {
        ensure!("keyDown", (); validate::non_empty_text("key", key));
        self.commands.key_down(key);
    }

    pub fn key_up(&self, key: &str) {
        ensure!("keyUp", (); validate::non_empty_text("key", key));
        self.commands.key_up(key);
    }

    // ---- models ----

    /// Start loading a model.
    ///
    /// An unusable URL yields a session that has already finished with a
    /// downloading error.
    pub fn load_model(&self, url: &str) -> LoadSession {
        match validate::resource_url(url) {
            Ok(_) => LoadSession::start(self.commands.clone(), url, self.load),
            Err(reason) => {
                let error = LoadError::new(LoadErrorKind::DownloadingError, reason.to_string());
                rejected("loadModel", reason, LoadSession::failed(url, error))
            }
        }
    }

    pub fn unload_model(&self, handle: u32) {
        if handle == INVALID_HANDLE {
            return rejected("unloadModel", Invalid("invalid model handle".into()), ());
        }
        self.commands.unload_model(handle);
    }
}
