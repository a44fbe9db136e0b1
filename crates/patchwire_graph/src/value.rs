// SPDX-License-Identifier: MIT OR Apache-2.0
//! The closed union of value kinds exchanged between ports.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scroll behavior selector carried by scroll-interaction nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScrollMode {
    /// Free scrolling, offset follows the gesture directly.
    #[default]
    Free,
    /// Scrolling snaps to page boundaries.
    Paging,
    /// Scrolling disabled, offset pinned to zero.
    Disabled,
}

/// Reference to an asynchronously produced media value.
///
/// Media decoding happens off the evaluation context; ports hold one of
/// these references and the runtime swaps in `Loaded` once a background
/// computation completes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum MediaRef {
    /// No media ("no media" sentinel, also the kind default).
    #[default]
    None,
    /// A computation is in flight and nothing has loaded before.
    Loading,
    /// Decoded media, identified by id with its pixel dimensions.
    Loaded {
        /// Identifier of the decoded media object.
        id: Uuid,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

/// A value flowing through a port.
///
/// The evaluation engine is generic over this union: broadcast and
/// scheduling logic never inspect which variant is present, only the
/// node evaluation functions do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
    /// Numeric scalar.
    Number(f64),
    /// Boolean.
    Bool(bool),
    /// Text string.
    Text(String),
    /// RGBA color.
    Color([f32; 4]),
    /// 2D position.
    Position([f64; 2]),
    /// 3D point.
    Point3D([f64; 3]),
    /// 4D point.
    Point4D([f64; 4]),
    /// Width/height pair.
    Size([f64; 2]),
    /// Scroll behavior option.
    ScrollMode(ScrollMode),
    /// Edge-triggered pulse: the graph time at which it fired, `0.0` if
    /// it has never fired.
    Pulse(f64),
    /// Opaque asynchronous media reference.
    Media(MediaRef),
    /// Structured JSON data.
    Json(serde_json::Value),
    /// Assignment to a layer node (interaction targets).
    LayerRef(Option<NodeId>),
}

/// The kind of a [`PortValue`], used for port typing and edge validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Numeric scalar.
    Number,
    /// Boolean.
    Bool,
    /// Text string.
    Text,
    /// RGBA color.
    Color,
    /// 2D position.
    Position,
    /// 3D point.
    Point3D,
    /// 4D point.
    Point4D,
    /// Width/height pair.
    Size,
    /// Scroll behavior option.
    ScrollMode,
    /// Edge-triggered pulse.
    Pulse,
    /// Asynchronous media reference.
    Media,
    /// Structured JSON data.
    Json,
    /// Layer assignment.
    LayerRef,
}

impl ValueKind {
    /// The documented zero/default value for this kind.
    ///
    /// This is the value substituted wherever a loop would otherwise be
    /// empty, and the value every output loop is forced to on prototype
    /// restart.
    pub fn default_value(&self) -> PortValue {
        match self {
            Self::Number => PortValue::Number(0.0),
            Self::Bool => PortValue::Bool(false),
            Self::Text => PortValue::Text(String::new()),
            Self::Color => PortValue::Color([0.0, 0.0, 0.0, 0.0]),
            Self::Position => PortValue::Position([0.0, 0.0]),
            Self::Point3D => PortValue::Point3D([0.0, 0.0, 0.0]),
            Self::Point4D => PortValue::Point4D([0.0, 0.0, 0.0, 0.0]),
            Self::Size => PortValue::Size([0.0, 0.0]),
            Self::ScrollMode => PortValue::ScrollMode(ScrollMode::default()),
            Self::Pulse => PortValue::Pulse(0.0),
            Self::Media => PortValue::Media(MediaRef::None),
            Self::Json => PortValue::Json(serde_json::Value::Null),
            Self::LayerRef => PortValue::LayerRef(None),
        }
    }

    /// Whether a value of `self` may be carried over an edge into a port
    /// of kind `to` via an explicit coercion step.
    ///
    /// Identical kinds always connect. The whitelist is deliberately
    /// small; anything else is a kind mismatch at edge creation.
    pub fn coercible_to(&self, to: ValueKind) -> bool {
        if *self == to {
            return true;
        }
        matches!(
            (self, to),
            (Self::Number, ValueKind::Bool)
                | (Self::Bool, ValueKind::Number)
                | (Self::Number, ValueKind::Text)
        )
    }
}

/// Normalize a degenerate float to zero.
///
/// Maps `NaN`, `±inf` and `-0.0` to `0.0`; every number leaving a pure
/// evaluation op goes through this.
pub fn normalized(x: f64) -> f64 {
    if x.is_finite() && x != 0.0 {
        x
    } else {
        0.0
    }
}

impl PortValue {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Number(_) => ValueKind::Number,
            Self::Bool(_) => ValueKind::Bool,
            Self::Text(_) => ValueKind::Text,
            Self::Color(_) => ValueKind::Color,
            Self::Position(_) => ValueKind::Position,
            Self::Point3D(_) => ValueKind::Point3D,
            Self::Point4D(_) => ValueKind::Point4D,
            Self::Size(_) => ValueKind::Size,
            Self::ScrollMode(_) => ValueKind::ScrollMode,
            Self::Pulse(_) => ValueKind::Pulse,
            Self::Media(_) => ValueKind::Media,
            Self::Json(_) => ValueKind::Json,
            Self::LayerRef(_) => ValueKind::LayerRef,
        }
    }

    /// Extract as a number, falling back to the numeric default.
    pub fn as_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    /// Extract as a boolean, falling back to `false`.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            _ => false,
        }
    }

    /// Extract as text, falling back to the empty string.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(s) => s,
            _ => "",
        }
    }

    /// Extract the pulse firing time, `0.0` for non-pulse values.
    pub fn as_pulse(&self) -> f64 {
        match self {
            Self::Pulse(t) => *t,
            _ => 0.0,
        }
    }

    /// Extract as a 2D position, falling back to the origin.
    pub fn as_position(&self) -> [f64; 2] {
        match self {
            Self::Position(p) => *p,
            Self::Size(s) => *s,
            _ => [0.0, 0.0],
        }
    }

    /// Extract as a 3D point, falling back to the origin.
    pub fn as_point3d(&self) -> [f64; 3] {
        match self {
            Self::Point3D(p) => *p,
            _ => [0.0, 0.0, 0.0],
        }
    }

    /// Extract the layer assignment, if any.
    pub fn as_layer_ref(&self) -> Option<NodeId> {
        match self {
            Self::LayerRef(id) => *id,
            _ => None,
        }
    }

    /// Extract the scroll mode, falling back to the default mode.
    pub fn as_scroll_mode(&self) -> ScrollMode {
        match self {
            Self::ScrollMode(m) => *m,
            _ => ScrollMode::default(),
        }
    }

    /// Extract the media reference, falling back to the sentinel.
    pub fn as_media(&self) -> MediaRef {
        match self {
            Self::Media(m) => m.clone(),
            _ => MediaRef::None,
        }
    }

    /// Explicitly coerce this value to another kind.
    ///
    /// Only the pairs admitted by [`ValueKind::coercible_to`] convert;
    /// everything else yields the target kind's default value. Coercion
    /// is applied by the scheduler when copying across an edge whose
    /// endpoint kinds differ, never silently inside an eval op.
    pub fn coerced_to(&self, kind: ValueKind) -> PortValue {
        if self.kind() == kind {
            return self.clone();
        }
        match (self, kind) {
            (Self::Number(n), ValueKind::Bool) => PortValue::Bool(*n != 0.0),
            (Self::Bool(b), ValueKind::Number) => PortValue::Number(if *b { 1.0 } else { 0.0 }),
            (Self::Number(n), ValueKind::Text) => PortValue::Text(normalized(*n).to_string()),
            _ => kind.default_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values_match_kind() {
        let kinds = [
            ValueKind::Number,
            ValueKind::Bool,
            ValueKind::Text,
            ValueKind::Color,
            ValueKind::Position,
            ValueKind::Point3D,
            ValueKind::Point4D,
            ValueKind::Size,
            ValueKind::ScrollMode,
            ValueKind::Pulse,
            ValueKind::Media,
            ValueKind::Json,
            ValueKind::LayerRef,
        ];
        for kind in kinds {
            assert_eq!(kind.default_value().kind(), kind);
        }
    }

    #[test]
    fn test_normalized_degenerate_floats() {
        assert_eq!(normalized(f64::NAN), 0.0);
        assert_eq!(normalized(f64::INFINITY), 0.0);
        assert_eq!(normalized(f64::NEG_INFINITY), 0.0);
        assert!(normalized(-0.0).is_sign_positive());
        assert_eq!(normalized(2.5), 2.5);
    }

    #[test]
    fn test_coercion_whitelist() {
        assert!(ValueKind::Number.coercible_to(ValueKind::Bool));
        assert!(ValueKind::Bool.coercible_to(ValueKind::Number));
        assert!(ValueKind::Number.coercible_to(ValueKind::Text));
        assert!(!ValueKind::Pulse.coercible_to(ValueKind::Number));
        assert!(!ValueKind::Text.coercible_to(ValueKind::Number));
    }

    #[test]
    fn test_coerced_to() {
        assert_eq!(
            PortValue::Number(2.0).coerced_to(ValueKind::Bool),
            PortValue::Bool(true)
        );
        assert_eq!(
            PortValue::Bool(true).coerced_to(ValueKind::Number),
            PortValue::Number(1.0)
        );
        // Unlisted pairs degrade to the target default.
        assert_eq!(
            PortValue::Text("x".into()).coerced_to(ValueKind::Number),
            PortValue::Number(0.0)
        );
    }

    #[test]
    fn test_accessor_fallbacks() {
        assert_eq!(PortValue::Text("hi".into()).as_number(), 0.0);
        assert_eq!(PortValue::Number(3.0).as_pulse(), 0.0);
        assert!(!PortValue::Pulse(1.0).as_bool());
    }
}
