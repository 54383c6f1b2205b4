#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Gem Replay adapters.
//!
//! The projector maps a replay position (current frame, bot trail, world
//! knowledge, heatmap toggle) onto [`FrameLayers`]: an ordered, fully
//! specified list of drawing layers any backend reproduces identically.
//! All geometry is expressed in cell space, where each maze cell is a unit
//! square; backends multiply by their pixel cell size when drawing.

use anyhow::Result as AnyResult;
use gem_replay_core::{GridPos, TickFrame, WorldKnowledge};
use glam::Vec2;

/// Stroke width of the bot trail, as a fraction of a cell.
const TRAIL_STROKE: f32 = 0.15;
/// Stroke width of the planned path, as a fraction of a cell.
const PATH_STROKE: f32 = 0.25;
/// Half-diagonal of a gem diamond, as a fraction of a cell.
const GEM_HALF_DIAGONAL: f32 = 0.4;
/// Radius of the bot circle, as a fraction of a cell.
const BOT_RADIUS: f32 = 0.3;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self::from_rgba_u8(red, green, blue, 255)
    }

    /// Creates a color from byte RGBA values.
    #[must_use]
    pub const fn from_rgba_u8(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: alpha as f32 / 255.0,
        }
    }

    /// Parses a `#rgb`, `#rrggbb`, or `#aarrggbb` hex color string.
    ///
    /// Returns `None` for anything else; callers decide the fallback.
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        let digits = value.strip_prefix('#')?;
        match digits.len() {
            3 => {
                let red = hex_nibble(digits, 0)?;
                let green = hex_nibble(digits, 1)?;
                let blue = hex_nibble(digits, 2)?;
                Some(Self::from_rgb_u8(red * 17, green * 17, blue * 17))
            }
            6 => {
                let red = hex_byte(digits, 0)?;
                let green = hex_byte(digits, 1)?;
                let blue = hex_byte(digits, 2)?;
                Some(Self::from_rgb_u8(red, green, blue))
            }
            8 => {
                let alpha = hex_byte(digits, 0)?;
                let red = hex_byte(digits, 1)?;
                let green = hex_byte(digits, 2)?;
                let blue = hex_byte(digits, 3)?;
                Some(Self::from_rgba_u8(red, green, blue, alpha))
            }
            _ => None,
        }
    }
}

fn hex_nibble(digits: &str, index: usize) -> Option<u8> {
    u8::from_str_radix(digits.get(index..=index)?, 16).ok()
}

fn hex_byte(digits: &str, index: usize) -> Option<u8> {
    u8::from_str_radix(digits.get(index * 2..index * 2 + 2)?, 16).ok()
}

/// Fixed colors of the replay presentation.
pub mod palette {
    use super::Color;

    /// Uniform canvas background.
    pub const BACKGROUND: Color = Color::from_rgb_u8(20, 20, 20);
    /// Opaque fill for known wall cells.
    pub const WALL: Color = Color::from_rgb_u8(70, 70, 70);
    /// Baseline fill for non-wall cells.
    pub const FLOOR: Color = Color::from_rgb_u8(30, 30, 30);
    /// Translucent tint over cells within the bot's field of view.
    pub const FOV_TINT: Color = Color::from_rgba_u8(255, 255, 100, 40);
    /// Fallback tint for highlights without a usable color.
    pub const HIGHLIGHT_FALLBACK: Color = Color::from_rgba_u8(255, 0, 255, 120);
    /// Gem diamond fill.
    pub const GEM_FILL: Color = Color::from_rgb_u8(0, 220, 255);
    /// Gem diamond outline.
    pub const GEM_OUTLINE: Color = Color::from_rgb_u8(255, 255, 255);
    /// Bot trail stroke.
    pub const TRAIL: Color = Color::from_rgb_u8(200, 200, 200);
    /// Bot circle fill.
    pub const BOT_FILL: Color = Color::from_rgb_u8(255, 220, 100);
    /// Bot circle outline.
    pub const BOT_OUTLINE: Color = Color::from_rgb_u8(0, 0, 0);
    /// Tint over cells the bot's state gained this tick.
    pub const DELTA_ADDED: Color = Color::from_rgba_u8(0, 180, 0, 120);
    /// Tint over cells the bot's state lost this tick.
    pub const DELTA_REMOVED: Color = Color::from_rgba_u8(180, 0, 0, 120);
    /// Planned path stroke.
    pub const PLANNED_PATH: Color = Color::from_rgb_u8(0, 255, 180);
    /// Alpha applied to heatmap-shaded cells.
    pub const HEAT_ALPHA: f32 = 180.0 / 255.0;
}

/// Opaque fill of one grid cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellFill {
    /// Cell being filled.
    pub cell: GridPos,
    /// Fill color.
    pub color: Color,
}

/// Translucent tint layered over one grid cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellTint {
    /// Cell being tinted.
    pub cell: GridPos,
    /// Tint color, including its alpha.
    pub color: Color,
}

/// Diamond glyph centered in a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiamondMarker {
    /// Center of the glyph in cell space.
    pub center: Vec2,
    /// Distance from the center to each diamond vertex.
    pub half_diagonal: f32,
    /// Fill color.
    pub fill: Color,
    /// Outline color.
    pub outline: Color,
}

/// Circle glyph centered in a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleMarker {
    /// Center of the glyph in cell space.
    pub center: Vec2,
    /// Circle radius in cell units.
    pub radius: f32,
    /// Fill color.
    pub fill: Color,
    /// Outline color.
    pub outline: Color,
}

/// Connected polyline through cell-space points.
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    /// Points to connect in order. Fewer than two points draw nothing.
    pub points: Vec<Vec2>,
    /// Stroke width in cell units.
    pub stroke_width: f32,
    /// Stroke color.
    pub color: Color,
}

/// One drawing layer of a projected frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    /// Uniform fill of the whole canvas.
    Background {
        /// Canvas color.
        color: Color,
    },
    /// Per-cell base fills: walls and floor/heatmap shading.
    BaseCells {
        /// One fill per grid cell, scanned row-major.
        fills: Vec<CellFill>,
    },
    /// Field-of-view tints.
    FieldOfView {
        /// Tinted cells.
        tints: Vec<CellTint>,
    },
    /// Payload-requested highlight tints.
    Highlights {
        /// Tinted cells.
        tints: Vec<CellTint>,
    },
    /// Gem diamond markers.
    Gems {
        /// One marker per live gem.
        markers: Vec<DiamondMarker>,
    },
    /// Bot trail polyline.
    Trail {
        /// Polyline through the known trail positions.
        line: Polyline,
    },
    /// Bot position marker. Emitted only when the position is known.
    Bot {
        /// Circle glyph at the current bot position.
        marker: CircleMarker,
    },
    /// State-delta tints from the debug payload.
    StateDelta {
        /// Cells gained this tick, tinted green.
        added: Vec<CellTint>,
        /// Cells lost this tick, tinted red.
        removed: Vec<CellTint>,
    },
    /// Planned-path polyline from the debug payload.
    PlannedPath {
        /// Polyline through the planned route.
        line: Polyline,
    },
}

impl Layer {
    /// Kind discriminant, useful for asserting layer order.
    #[must_use]
    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Background { .. } => LayerKind::Background,
            Self::BaseCells { .. } => LayerKind::BaseCells,
            Self::FieldOfView { .. } => LayerKind::FieldOfView,
            Self::Highlights { .. } => LayerKind::Highlights,
            Self::Gems { .. } => LayerKind::Gems,
            Self::Trail { .. } => LayerKind::Trail,
            Self::Bot { .. } => LayerKind::Bot,
            Self::StateDelta { .. } => LayerKind::StateDelta,
            Self::PlannedPath { .. } => LayerKind::PlannedPath,
        }
    }
}

/// Discriminant of a [`Layer`], in back-to-front draw order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Canvas background.
    Background,
    /// Per-cell base fills.
    BaseCells,
    /// Field-of-view tints.
    FieldOfView,
    /// Highlight tints.
    Highlights,
    /// Gem markers.
    Gems,
    /// Bot trail.
    Trail,
    /// Bot marker.
    Bot,
    /// State-delta tints.
    StateDelta,
    /// Planned path.
    PlannedPath,
}

/// Complete layered description of one presented frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameLayers {
    /// Grid width in cells the layers were projected against.
    pub width: u32,
    /// Grid height in cells the layers were projected against.
    pub height: u32,
    /// Layers in back-to-front draw order.
    pub layers: Vec<Layer>,
}

/// Projects a replay position onto its layered frame description.
///
/// Without a current frame only the background and base-cell layers are
/// emitted. With one, overlays follow in the fixed order: field of view,
/// highlights, gems, trail, bot marker (only when the position is known),
/// state delta, planned path. Unresolved grid dimensions default to one
/// cell, matching the degenerate single-cell canvas of an empty round.
#[must_use]
pub fn project(
    frame: Option<&TickFrame>,
    trail: &[GridPos],
    knowledge: &WorldKnowledge,
    heatmap_enabled: bool,
) -> FrameLayers {
    let width = knowledge.width().unwrap_or(1);
    let height = knowledge.height().unwrap_or(1);

    let mut layers = Vec::with_capacity(9);
    layers.push(Layer::Background {
        color: palette::BACKGROUND,
    });
    layers.push(Layer::BaseCells {
        fills: base_cells(width, height, knowledge, heatmap_enabled),
    });

    let Some(frame) = frame else {
        return FrameLayers {
            width,
            height,
            layers,
        };
    };

    layers.push(Layer::FieldOfView {
        tints: tint_cells(&frame.fov, palette::FOV_TINT),
    });

    let highlight_tints = frame
        .debug_extra
        .as_ref()
        .map(|extra| {
            extra
                .highlight
                .iter()
                .map(|request| CellTint {
                    cell: request.cell,
                    color: highlight_color(request.color.as_deref()),
                })
                .collect()
        })
        .unwrap_or_default();
    layers.push(Layer::Highlights {
        tints: highlight_tints,
    });

    layers.push(Layer::Gems {
        markers: frame
            .gems
            .iter()
            .map(|&cell| DiamondMarker {
                center: cell_center(cell),
                half_diagonal: GEM_HALF_DIAGONAL,
                fill: palette::GEM_FILL,
                outline: palette::GEM_OUTLINE,
            })
            .collect(),
    });

    layers.push(Layer::Trail {
        line: Polyline {
            points: trail.iter().copied().map(cell_center).collect(),
            stroke_width: TRAIL_STROKE,
            color: palette::TRAIL,
        },
    });

    if let Some(cell) = frame.bot_position {
        layers.push(Layer::Bot {
            marker: CircleMarker {
                center: cell_center(cell),
                radius: BOT_RADIUS,
                fill: palette::BOT_FILL,
                outline: palette::BOT_OUTLINE,
            },
        });
    }

    let (added, removed) = frame
        .debug_extra
        .as_ref()
        .and_then(|extra| extra.state_delta.as_ref())
        .map(|delta| {
            (
                tint_cells(&delta.added, palette::DELTA_ADDED),
                tint_cells(&delta.removed, palette::DELTA_REMOVED),
            )
        })
        .unwrap_or_default();
    layers.push(Layer::StateDelta { added, removed });

    let path_points = frame
        .debug_extra
        .as_ref()
        .map(|extra| extra.path.iter().copied().map(cell_center).collect())
        .unwrap_or_default();
    layers.push(Layer::PlannedPath {
        line: Polyline {
            points: path_points,
            stroke_width: PATH_STROKE,
            color: palette::PLANNED_PATH,
        },
    });

    FrameLayers {
        width,
        height,
        layers,
    }
}

/// Resolves a payload-requested highlight color, falling back to the
/// translucent magenta tint when the request is missing or unparsable.
#[must_use]
pub fn highlight_color(request: Option<&str>) -> Color {
    request
        .and_then(Color::from_hex)
        .unwrap_or(palette::HIGHLIGHT_FALLBACK)
}

fn base_cells(
    width: u32,
    height: u32,
    knowledge: &WorldKnowledge,
    heatmap_enabled: bool,
) -> Vec<CellFill> {
    let max_visits = knowledge.max_visits();
    let mut fills = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height {
        for x in 0..width {
            let cell = GridPos::new(x, y);
            let color = if knowledge.is_wall(cell) {
                palette::WALL
            } else if heatmap_enabled && knowledge.visit_count(cell) > 0 {
                let ratio =
                    (knowledge.visit_count(cell) as f32 / max_visits as f32).min(1.0);
                Color::new(ratio, 0.0, 0.0, palette::HEAT_ALPHA)
            } else {
                palette::FLOOR
            };
            fills.push(CellFill { cell, color });
        }
    }

    fills
}

fn tint_cells(cells: &[GridPos], color: Color) -> Vec<CellTint> {
    cells.iter().map(|&cell| CellTint { cell, color }).collect()
}

fn cell_center(cell: GridPos) -> Vec2 {
    Vec2::new(cell.x() as f32 + 0.5, cell.y() as f32 + 0.5)
}

/// Rendering backend capable of presenting projected replay frames.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `next_frame` closure is polled once per presented
    /// frame; returning `None` leaves the previous frame on screen,
    /// letting hosts re-project only when the replay position changes.
    fn run<F>(self, initial: FrameLayers, next_frame: F) -> AnyResult<()>
    where
        F: FnMut() -> Option<FrameLayers> + 'static;
}
