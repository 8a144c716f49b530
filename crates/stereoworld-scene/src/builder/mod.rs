//! Named scene builders.
//!
//! Each builder registers the textures it needs and returns the root of a
//! freshly built scene graph. Builders only compose primitives and
//! transforms; the aggregation rules live in [`crate::node`].

mod cube;
mod room;
mod table;

use std::sync::Arc;

use crate::error::SceneError;
use crate::node::Node;
use crate::texture::TextureRegistry;

pub use cube::{CubeBuilder, MultiCubeBuilder};
pub use room::RoomBuilder;
pub use table::TableBuilder;

pub trait SceneBuilder {
    fn build(&self, textures: &mut TextureRegistry) -> Result<Arc<Node>, SceneError>;
}

/// Builder selection with its parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SceneKind {
    Cube { size: f32 },
    MultiCube { size: f32 },
    Room { size: f32 },
    Table { width: f32, length: f32, height: f32 },
}

impl SceneKind {
    /// Parses a builder name and its colon-separated parameters,
    /// e.g. `("table", "0.5:0.5:0.4")`.
    pub fn parse(kind: &str, params: &str) -> Result<Self, SceneError> {
        let (builder, arity) = match kind {
            "cube" => ("cube", 1),
            "multicube" => ("multicube", 1),
            "room" => ("room", 1),
            "table" => ("table", 3),
            other => {
                return Err(SceneError::builder(
                    "scene",
                    format!("unknown scene '{other}' (expected cube, multicube, room or table)"),
                ));
            }
        };

        let values = params
            .split(':')
            .map(|p| {
                p.trim().parse::<f32>().map_err(|_| {
                    SceneError::builder(builder, format!("'{p}' is not a number"))
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;

        if values.len() != arity {
            return Err(SceneError::builder(
                builder,
                format!("expected {arity} colon-separated value(s), got {}", values.len()),
            ));
        }

        Ok(match kind {
            "cube" => SceneKind::Cube { size: values[0] },
            "multicube" => SceneKind::MultiCube { size: values[0] },
            "room" => SceneKind::Room { size: values[0] },
            _ => SceneKind::Table { width: values[0], length: values[1], height: values[2] },
        })
    }
}

/// Runs the builder selected by `kind`.
pub fn build_scene(kind: SceneKind, textures: &mut TextureRegistry) -> Result<Arc<Node>, SceneError> {
    match kind {
        SceneKind::Cube { size } => CubeBuilder::new(size).build(textures),
        SceneKind::MultiCube { size } => MultiCubeBuilder::new(size).build(textures),
        SceneKind::Room { size } => RoomBuilder::new(size).build(textures),
        SceneKind::Table { width, length, height } => {
            TableBuilder::new(width, length, height).build(textures)
        }
    }
}

pub(crate) fn require_positive(builder: &'static str, what: &str, value: f32) -> Result<(), SceneError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SceneError::builder(builder, format!("{what} must be positive, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_triplet() {
        assert_eq!(
            SceneKind::parse("table", "0.5:0.5:0.4").unwrap(),
            SceneKind::Table { width: 0.5, length: 0.5, height: 0.4 }
        );
    }

    #[test]
    fn parses_single_size() {
        assert_eq!(SceneKind::parse("room", "6").unwrap(), SceneKind::Room { size: 6.0 });
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let err = SceneKind::parse("table", "0.5:0.5").unwrap_err();
        assert!(matches!(err, SceneError::InvalidBuilderParameters { builder: "table", .. }));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(SceneKind::parse("sphere", "1").is_err());
    }

    #[test]
    fn non_numeric_parameter_is_rejected() {
        assert!(SceneKind::parse("cube", "big").is_err());
    }
}
